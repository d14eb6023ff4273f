use crate::{
    facet::{facet::Facet, facet_kind::FacetKind, facet_kinds::FacetKinds},
    permissions::{handler::Handler, permissions::Permissions},
};

pub mod error;
pub use error::ProtocolError;

/// Facet registrations and permission tables shared by both roles.
///
/// Build one on every participating process with the same facets, then
/// hand it to the server or client.
pub struct Protocol {
    pub facet_kinds: FacetKinds,
    pub permissions: Permissions,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        let facet_kinds = FacetKinds::new();
        let mut permissions = Permissions::new();
        for kind in facet_kinds.kinds() {
            if let Some(handler) = facet_kinds.required_visibility(&kind) {
                permissions.set_required_visibility(kind, handler);
            }
        }

        Self {
            facet_kinds,
            permissions,
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the protocol is locked or another type already uses `F::TYPE_NAME`.
    /// Consider using `try_add_facet()` for a non-panicking alternative.
    pub fn add_facet<F: Facet>(&mut self) -> &mut Self {
        if let Err(err) = self.try_add_facet::<F>() {
            panic!("{}", err);
        }
        self
    }

    /// Sets the Visibility rule for `F`. A mandatory Visibility declared by
    /// the facet type still takes precedence.
    ///
    /// # Panics
    ///
    /// Panics if the protocol is locked or `F` is not registered.
    /// Consider using `try_visibility()` for a non-panicking alternative.
    pub fn visibility<F: Facet>(&mut self, handler: Handler) -> &mut Self {
        if let Err(err) = self.try_visibility::<F>(handler) {
            panic!("{}", err);
        }
        self
    }

    /// # Panics
    ///
    /// Panics if the protocol is locked or `F` is not registered.
    /// Consider using `try_mutability()` for a non-panicking alternative.
    pub fn mutability<F: Facet>(&mut self, handler: Handler) -> &mut Self {
        if let Err(err) = self.try_mutability::<F>(handler) {
            panic!("{}", err);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_facet<F: Facet>(&mut self) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.facet_kinds.add_facet::<F>()?;
        if let Some(handler) = F::required_visibility() {
            self.permissions
                .set_required_visibility(FacetKind::of::<F>(), handler);
        }
        Ok(self)
    }

    pub fn try_visibility<F: Facet>(&mut self, handler: Handler) -> Result<&mut Self, ProtocolError> {
        let kind = self.try_check_rule::<F>()?;
        self.permissions.set_visibility(kind, handler);
        Ok(self)
    }

    pub fn try_mutability<F: Facet>(&mut self, handler: Handler) -> Result<&mut Self, ProtocolError> {
        let kind = self.try_check_rule::<F>()?;
        self.permissions.set_mutability(kind, handler);
        Ok(self)
    }

    fn try_check_rule<F: Facet>(&self) -> Result<FacetKind, ProtocolError> {
        self.try_check_lock()?;
        let kind = FacetKind::of::<F>();
        if !self.facet_kinds.is_registered(&kind) {
            return Err(ProtocolError::FacetNotRegistered {
                type_name: F::TYPE_NAME,
            });
        }
        Ok(kind)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    /// Returns Err if protocol is locked
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
