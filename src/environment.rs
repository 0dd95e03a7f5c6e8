use clap::ValueEnum;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Deployment the client talks to.
#[derive(Clone, Default, Copy, PartialEq, Eq, ValueEnum, Debug)]
pub enum EnvironmentType {
    /// Flask development server on the local machine.
    #[default]
    Local,
    /// Staging deployment for pre-production testing.
    Staging,
    /// Production deployment.
    Production,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub env_type: EnvironmentType,
    /// Overrides the built-in URL for `env_type` when set.
    pub base_url: Option<String>,
}

impl Environment {
    pub fn new(env_type: EnvironmentType) -> Self {
        Self {
            env_type,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Base URL of the inspection backend, without a trailing slash.
    pub fn api_url(&self) -> String {
        let url = match &self.base_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => match self.env_type {
                EnvironmentType::Local => "http://localhost:5000".to_string(),
                EnvironmentType::Staging => "https://staging.wagon-inspection.internal".to_string(),
                EnvironmentType::Production => "https://wagon-inspection.internal".to_string(),
            },
        };
        url.trim_end_matches('/').to_string()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EnvironmentType::default())
    }
}

impl FromStr for EnvironmentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(EnvironmentType::Local),
            "staging" => Ok(EnvironmentType::Staging),
            "production" | "prod" => Ok(EnvironmentType::Production),
            _ => Err(()),
        }
    }
}

impl Display for EnvironmentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentType::Local => write!(f, "Local"),
            EnvironmentType::Staging => write!(f, "Staging"),
            EnvironmentType::Production => write!(f, "Production"),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.env_type, self.api_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Staging".parse::<EnvironmentType>(), Ok(EnvironmentType::Staging));
        assert_eq!("prod".parse::<EnvironmentType>(), Ok(EnvironmentType::Production));
        assert!("beta".parse::<EnvironmentType>().is_err());
    }

    #[test]
    // A configured base URL wins over the built-in one and loses its trailing slash.
    fn test_base_url_override() {
        let env = Environment::new(EnvironmentType::Production).with_base_url("http://10.0.0.7:8080/");
        assert_eq!(env.api_url(), "http://10.0.0.7:8080");

        let blank = Environment::new(EnvironmentType::Local).with_base_url("  ");
        assert_eq!(blank.api_url(), "http://localhost:5000");
    }
}
