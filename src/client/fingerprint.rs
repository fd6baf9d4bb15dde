use sha2::{Digest, Sha256};

/// Host characteristics that stay put across runs on the same machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTraits {
    traits: Vec<(&'static str, String)>,
}

impl DeviceTraits {
    pub fn collect() -> Self {
        let env = |key: &str| std::env::var(key).unwrap_or_default();
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self::from_pairs(vec![
            ("os", std::env::consts::OS.to_string()),
            ("family", std::env::consts::FAMILY.to_string()),
            ("arch", std::env::consts::ARCH.to_string()),
            ("cpus", cpus.to_string()),
            ("lang", env("LANG")),
            ("term", env("TERM")),
            ("shell", env("SHELL")),
        ])
    }

    pub fn from_pairs(mut traits: Vec<(&'static str, String)>) -> Self {
        traits.sort();
        Self { traits }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.traits
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Lowercase hex SHA-256 over the sorted `name=value` lines.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, value) in &self.traits {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn user_agent(&self) -> String {
        format!(
            "osint-terminal/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            self.get("os").unwrap_or("unknown"),
            self.get("arch").unwrap_or("unknown")
        )
    }
}
