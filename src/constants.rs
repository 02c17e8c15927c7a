pub mod ids {

    /// `ascii_letters + digits`
    pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    pub const SUFFIX_LEN: usize = 32;

    /// Draws before giving up on finding an unused suffix.
    pub const MAX_ISSUE_ATTEMPTS: usize = 8;
}

pub mod choices {

    pub const MALE: &str = "Male";

    pub const FEMALE: &str = "Female";

    pub const PREFER_NOT: &str = "Prefer Not to Say";

    pub const OTHERS: &str = "Others";

    pub const GENDERS: &[&str] = &[MALE, FEMALE, PREFER_NOT, OTHERS];

    pub const PUBLIC: &str = "Public";

    pub const PRIVATE: &str = "Private";

    pub const PRIVACY: &[&str] = &[PUBLIC, PRIVATE];
}

pub mod session {

    pub const USER_KEY: &str = "userid";

    pub const FLASHES_KEY: &str = "_flashes";
}

pub mod limits {

    pub const PROJECT_DESCRIPTION_MAX: usize = 100;

    pub const PROJECT_FIELDS_MAX: usize = 512;

    pub const MISCONDUCT_DESCRIPTION_MAX: usize = 140;

    pub const MESSAGE_MAX: usize = 512;

    pub const APPLICATION_BODY_MAX: usize = 512;

    pub const USERNAME_MAX: usize = 64;

    pub const EMAIL_MAX: usize = 120;

    pub const AVATAR_SIZE: u32 = 128;
}

pub mod defaults {

    pub const PROJECT_NAME: &str = "New Project";

    pub const MEMBER_LIST: &str = "Can't be filled right now!";
}
