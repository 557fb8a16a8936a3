//! Rendering of `wp-tests-config.php` from the upstream sample.

/// Placeholder text in `wp-tests-config-sample.php`.
pub const ABSPATH_PLACEHOLDER: &str = "dirname( __FILE__ ) . '/src/'";
pub const DB_NAME_PLACEHOLDER: &str = "youremptytestdbnamehere";
pub const DB_USER_PLACEHOLDER: &str = "yourusernamehere";
pub const DB_PASSWORD_PLACEHOLDER: &str = "yourpasswordhere";
pub const DB_HOST_PLACEHOLDER: &str = "localhost";

/// Values substituted into the sample config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestsConfig {
    /// WordPress core directory, written as ABSPATH.
    pub core_dir: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
}

impl TestsConfig {
    /// Renders `sample`, replacing the first occurrence of each placeholder.
    ///
    /// Occurrences are located in `sample` itself and the output is built in
    /// a single pass, so a substituted value is never matched by a later
    /// placeholder. A placeholder whose first occurrence overlaps an earlier
    /// one is left alone.
    pub fn render(&self, sample: &str) -> String {
        let abspath = format!("'{}'", self.core_dir);
        let substitutions = [
            (ABSPATH_PLACEHOLDER, abspath.as_str()),
            (DB_NAME_PLACEHOLDER, self.db_name.as_str()),
            (DB_USER_PLACEHOLDER, self.db_user.as_str()),
            (DB_PASSWORD_PLACEHOLDER, self.db_password.as_str()),
            (DB_HOST_PLACEHOLDER, self.db_host.as_str()),
        ];

        let mut spans: Vec<(usize, usize, &str)> = Vec::new();
        for (placeholder, value) in substitutions {
            let Some(start) = sample.find(placeholder) else {
                continue;
            };
            let end = start + placeholder.len();
            if spans.iter().all(|&(s, e, _)| end <= s || start >= e) {
                spans.push((start, end, value));
            }
        }
        spans.sort_by_key(|&(start, _, _)| start);

        let mut rendered = String::with_capacity(sample.len());
        let mut cursor = 0;
        for (start, end, value) in spans {
            rendered.push_str(&sample[cursor..start]);
            rendered.push_str(value);
            cursor = end;
        }
        rendered.push_str(&sample[cursor..]);
        rendered
    }
}
