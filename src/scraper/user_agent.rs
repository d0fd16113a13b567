use rand::seq::SliceRandom;
use std::sync::Arc;

/// Supplies the browser identity for each new session
pub trait IdentityProvider: Send + Sync {
    fn user_agent(&self) -> String;
}

/// User agent rotator for avoiding detection
pub struct UserAgentRotator {
    user_agents: Arc<Vec<String>>,
}

impl UserAgentRotator {
    pub fn new(user_agents: &[String]) -> Self {
        let configured: Vec<String> = user_agents
            .iter()
            .map(|ua| ua.trim())
            .filter(|ua| !ua.is_empty())
            .map(str::to_string)
            .collect();

        let agents = if configured.is_empty() {
            Self::default_user_agents()
        } else {
            configured
        };

        Self {
            user_agents: Arc::new(agents),
        }
    }

    /// Get a random user agent
    pub fn get_random_user_agent(&self) -> &str {
        let mut rng = rand::thread_rng();
        self.user_agents
            .choose(&mut rng)
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn default_user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
        ]
    }
}

impl IdentityProvider for UserAgentRotator {
    fn user_agent(&self) -> String {
        self.get_random_user_agent().to_string()
    }
}

impl Default for UserAgentRotator {
    fn default() -> Self {
        Self::new(&[])
    }
}
