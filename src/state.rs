use serde::{Deserialize, Serialize};

/// Lifecycle of one supervised web service process.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumIs,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl LifecycleState {
    pub fn style(&self) -> String {
        let s = self.to_string();
        match self {
            LifecycleState::Stopped => console::style(s).dim().to_string(),
            LifecycleState::Starting => console::style(s).yellow().to_string(),
            LifecycleState::Started => console::style(s).green().to_string(),
            LifecycleState::Stopping => console::style(s).yellow().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_state_display() {
        assert_eq!(LifecycleState::default(), LifecycleState::Stopped);
        assert_eq!(LifecycleState::Starting.to_string(), "starting");
        assert!(LifecycleState::Started.is_started());
        assert!(!LifecycleState::Stopping.is_stopped());
    }

    #[test]
    fn test_lifecycle_state_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            state: LifecycleState,
        }
        let raw = toml::to_string(&Wrapper {
            state: LifecycleState::Stopping,
        })
        .unwrap();
        assert_eq!(raw.trim(), r#"state = "stopping""#);
        let parsed: Wrapper = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.state, LifecycleState::Stopping);
    }
}
