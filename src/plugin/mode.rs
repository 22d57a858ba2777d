//! Build mode of the host build.

/// Build mode the plugin runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Production build (as opposed to the development server).
    pub production: bool,

    /// Server-side rendering pass.
    pub ssr: bool,
}

impl BuildMode {
    /// Client bundle of a production build: derivatives are emitted.
    pub const PRODUCTION: Self = Self {
        production: true,
        ssr: false,
    };

    /// Server-rendering pass of a production build.
    pub const SSR: Self = Self {
        production: true,
        ssr: true,
    };

    /// Development server.
    pub const DEVELOPMENT: Self = Self {
        production: false,
        ssr: false,
    };

    /// Whether loads resolve and encode derivatives.
    ///
    /// Server rendering only needs the fallback, so only the client bundle
    /// of a production build pays for encoding.
    #[inline]
    pub const fn emits_derivatives(&self) -> bool {
        self.production && !self.ssr
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::DEVELOPMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_production_client_emits() {
        assert!(BuildMode::PRODUCTION.emits_derivatives());
        assert!(!BuildMode::SSR.emits_derivatives());
        assert!(!BuildMode::DEVELOPMENT.emits_derivatives());
        assert!(
            !BuildMode {
                production: false,
                ssr: true
            }
            .emits_derivatives()
        );
    }
}
