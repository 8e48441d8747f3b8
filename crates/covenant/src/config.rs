//! Manager configuration.
//!
//! Every switch defaults to seeking permission; integrators opt usages out
//! one at a time. The admin originator is passed to the manager separately
//! since it is an identity, not a policy.

/// What a protocol permission is being exercised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolUsage {
    /// Creating signatures.
    Signing,
    /// Encrypting or decrypting data.
    Encrypting,
    /// Computing HMACs.
    Hmac,
    /// Revealing key linkage information.
    KeyLinkageRevelation,
    /// Resolving identity keys.
    IdentityResolution,
    /// Anything without a dedicated switch.
    Generic,
}

/// What a basket access is being exercised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketUsage {
    /// Inserting outputs into the basket.
    Insertion,
    /// Removing or relinquishing outputs.
    Removal,
    /// Listing the basket's contents.
    Listing,
}

/// What a certificate access is being exercised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateUsage {
    /// Disclosing fields to a verifier.
    Disclosure,
    /// Listing held certificates.
    Listing,
}

/// Policy switches for a permissions manager instance.
#[derive(Debug, Clone)]
pub struct PermissionsConfig {
    /// Seek protocol permission when signing.
    pub seek_protocol_permissions_for_signing: bool,
    /// Seek protocol permission when encrypting.
    pub seek_protocol_permissions_for_encrypting: bool,
    /// Seek protocol permission when computing HMACs.
    pub seek_protocol_permissions_for_hmac: bool,
    /// Seek permission before revealing key linkage.
    pub seek_permissions_for_key_linkage: bool,
    /// Seek permission before resolving identities.
    pub seek_permissions_for_identity_resolution: bool,
    /// Seek basket permission for insertions.
    pub seek_basket_insertion_permissions: bool,
    /// Seek basket permission for removals.
    pub seek_basket_removal_permissions: bool,
    /// Seek basket permission for listings.
    pub seek_basket_listing_permissions: bool,
    /// Seek certificate permission for disclosure.
    pub seek_certificate_disclosure_permissions: bool,
    /// Seek certificate permission for listing.
    pub seek_certificate_listing_permissions: bool,
    /// Seek spending authorization at all.
    pub seek_spending_permissions: bool,
    /// Offer grouped (BRC-73) permission requests.
    pub seek_grouped_permission: bool,
    /// On a spending overage, ask for a higher authorization instead of
    /// rejecting outright.
    pub allow_spending_limit_increase: bool,
    /// Track privileged and unprivileged grants as distinct slots. When
    /// off, every request is treated as unprivileged.
    pub differentiate_privileged_operations: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            seek_protocol_permissions_for_signing: true,
            seek_protocol_permissions_for_encrypting: true,
            seek_protocol_permissions_for_hmac: true,
            seek_permissions_for_key_linkage: true,
            seek_permissions_for_identity_resolution: true,
            seek_basket_insertion_permissions: true,
            seek_basket_removal_permissions: true,
            seek_basket_listing_permissions: true,
            seek_certificate_disclosure_permissions: true,
            seek_certificate_listing_permissions: true,
            seek_spending_permissions: true,
            seek_grouped_permission: true,
            allow_spending_limit_increase: true,
            differentiate_privileged_operations: true,
        }
    }
}

impl PermissionsConfig {
    /// Whether a protocol usage requires permission under this config.
    pub fn seeks_protocol(&self, usage: ProtocolUsage) -> bool {
        match usage {
            ProtocolUsage::Signing => self.seek_protocol_permissions_for_signing,
            ProtocolUsage::Encrypting => self.seek_protocol_permissions_for_encrypting,
            ProtocolUsage::Hmac => self.seek_protocol_permissions_for_hmac,
            ProtocolUsage::KeyLinkageRevelation => self.seek_permissions_for_key_linkage,
            ProtocolUsage::IdentityResolution => self.seek_permissions_for_identity_resolution,
            ProtocolUsage::Generic => true,
        }
    }

    /// Whether a basket usage requires permission under this config.
    pub fn seeks_basket(&self, usage: BasketUsage) -> bool {
        match usage {
            BasketUsage::Insertion => self.seek_basket_insertion_permissions,
            BasketUsage::Removal => self.seek_basket_removal_permissions,
            BasketUsage::Listing => self.seek_basket_listing_permissions,
        }
    }

    /// Whether a certificate usage requires permission under this config.
    pub fn seeks_certificate(&self, usage: CertificateUsage) -> bool {
        match usage {
            CertificateUsage::Disclosure => self.seek_certificate_disclosure_permissions,
            CertificateUsage::Listing => self.seek_certificate_listing_permissions,
        }
    }
}
