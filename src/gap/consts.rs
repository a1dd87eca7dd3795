bitflags::bitflags! {
    /// Advertising data flags (\[CSS\] Part A, Section 1.3).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct AdvFlag: u8 {
        /// LE Limited Discoverable Mode.
        const LE_LIMITED = 1 << 0;
        /// LE General Discoverable Mode.
        const LE_GENERAL = 1 << 1;
        /// BR/EDR Not Supported.
        const NO_BREDR = 1 << 2;
    }
}

/// Response data types ([Assigned Numbers] Section 2.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_enum::IntoPrimitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum ResponseDataType {
    Flags = 0x01,
    IncompleteServiceClass128 = 0x06,
    CompleteServiceClass128 = 0x07,
    ShortLocalName = 0x08,
    CompleteLocalName = 0x09,
    TxPower = 0x0A,
    PeripheralConnectionIntervalRange = 0x12,
}

/// Maximum legacy advertising or scan response payload length
/// ([Vol 6] Part B, Section 2.3.1).
pub const LEGACY_ADV_DATA_MAX: usize = 31;
