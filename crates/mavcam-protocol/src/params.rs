//! Camera parameter catalog.

/// Parameters reported for `PARAM_EXT_REQUEST_LIST`, in emission order.
pub const CAMERA_PARAMETERS: [&str; 7] = [
    "EXPOSURE_MODE",
    "ISO",
    "SHUTTERSPD",
    "APERTURE",
    "WHITE_BALANCE",
    "EXPOSURE_COMP",
    "COMPR_SETTING",
];

/// `param_count` advertised in every `PARAM_EXT_VALUE`.
///
/// Fixed at 4 independently of the catalog length.
pub const REPORTED_PARAMETER_COUNT: u16 = 4;

/// Numeric value of `MAV_PARAM_EXT_TYPE_UINT8`.
pub const PARAM_TYPE_UINT8: u8 = 1;

/// Returns the catalog position of a parameter name.
pub fn parameter_index(name: &str) -> Option<u16> {
    CAMERA_PARAMETERS
        .iter()
        .position(|p| *p == name)
        .map(|i| i as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_positions() {
        assert_eq!(parameter_index("EXPOSURE_MODE"), Some(0));
        assert_eq!(parameter_index("COMPR_SETTING"), Some(6));
        assert_eq!(parameter_index("FOCUS"), None);
    }
}
