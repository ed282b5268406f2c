//! Field and attribute names used by device inventory documents.

/// Attribute on a device element carrying its serial number (`SrNo`).
pub const SERIAL_ATTR: &str = "SrNo";
/// Container element whose children are flattened into the parent record.
pub const COMM_SETTING: &str = "CommSetting";

/// Device IP address (`Address`).
pub const ADDRESS: &str = "Address";
/// Human readable device name (`DevName`).
pub const DEV_NAME: &str = "DevName";
/// Device model name (`ModelName`).
pub const MODEL_NAME: &str = "ModelName";
/// Device type (`Type`).
pub const TYPE: &str = "Type";
/// Communication port, flattened from `CommSetting/PortNo`.
pub const COMM_PORT_NO: &str = "CommSetting_PortNo";
/// SSL switch, flattened from `CommSetting/UseSSL`.
pub const COMM_USE_SSL: &str = "CommSetting_UseSSL";
/// Access password, flattened from `CommSetting/Password`.
pub const COMM_PASSWORD: &str = "CommSetting_Password";

/// Keys every complete device record is expected to carry.
pub const REQUIRED: [&str; 7] = [
    ADDRESS,
    DEV_NAME,
    MODEL_NAME,
    TYPE,
    COMM_PORT_NO,
    COMM_USE_SSL,
    COMM_PASSWORD,
];

/// Build the flattened key for a field nested under `container`.
pub fn flattened(container: &str, field: &str) -> String {
    format!("{container}_{field}")
}
