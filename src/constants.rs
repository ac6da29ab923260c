pub mod accounts {

    pub const MMM_PREFIX: &str = "mmm";

    pub const MMM_DIGITS: usize = 4;

    pub const USERNAME_LENGTH: usize = 7;

    /// Warn once the allocated range is this close to the last existing account.
    pub const CAPACITY_WARNING_MARGIN: u32 = 100;

    pub const DEFAULT_MAX_MMM_ACCOUNT: u32 = 1800;

    pub const DEFAULT_INSTITUTIONAL_DOMAIN: &str = "ucl.ac.uk";

    /// Open requests kept around for testing; never automated.
    pub const DEFAULT_RESERVED_REQUEST_IDS: &[i32] = &[7, 8, 10, 11, 778];
}

pub mod status {

    pub const PENDING: &str = "pending";

    pub const ACTIVE: &str = "active";

    pub const DEACTIVATED: &str = "deactivated";
}
