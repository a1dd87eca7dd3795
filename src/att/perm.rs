bitflags::bitflags! {
    /// Attribute permissions ([Vol 3] Part F, Section 3.2.5). Security
    /// requirements are enforced by the external stack and are not modelled
    /// here.
    #[derive(
        Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize,
    )]
    #[must_use]
    #[repr(transparent)]
    pub struct Perms: u8 {
        /// Read access.
        const READ = 1 << 0;
        /// Write access.
        const WRITE = 1 << 1;
        /// Read/write access.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}
