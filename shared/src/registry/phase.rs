use std::fmt;

/// Replication state of one registry instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegistryPhase {
    /// Purely local, writes go straight to the map
    #[default]
    Disabled,
    /// Transport is up, waiting for the local records to be admitted
    Joining,
    /// Replicating
    InUse,
    /// Transport was lost, local records are being reclaimed
    Disconnecting,
}

impl RegistryPhase {
    pub fn is_networked(&self) -> bool {
        matches!(self, RegistryPhase::InUse)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, RegistryPhase::Joining | RegistryPhase::Disconnecting)
    }
}

impl fmt::Display for RegistryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryPhase::Disabled => "DISABLED",
            RegistryPhase::Joining => "JOINING",
            RegistryPhase::InUse => "IN_USE",
            RegistryPhase::Disconnecting => "DISCONNECTING",
        };
        f.write_str(name)
    }
}
