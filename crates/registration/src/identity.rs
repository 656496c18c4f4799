use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::OsRng;
use rand::Rng;

use crate::email::DisposableMailbox;

pub const PASSWORD_LENGTH: usize = 16;
pub const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

pub const MIN_AGE: i32 = 19;
pub const MAX_AGE: i32 = 34;

/// A synthesized registrant.
#[derive(Clone)]
pub struct Identity {
    pub email: String,
    pub password: String,
    /// `YYYY-MM-DD`
    pub birthdate: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("birthdate", &self.birthdate)
            .finish()
    }
}

pub fn generate_password() -> String {
    let mut rng = OsRng;
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

pub fn generate_birthdate() -> String {
    birthdate_relative_to(Utc::now().date_naive())
}

/// Birthdate for someone aged 19 to 34 in `today`'s year.
pub fn birthdate_relative_to(today: NaiveDate) -> String {
    let mut rng = rand::thread_rng();
    let age = rng.gen_range(MIN_AGE..=MAX_AGE);
    let month: u32 = rng.gen_range(1..=12);
    let day: u32 = rng.gen_range(1..=28);
    format!("{:04}-{:02}-{:02}", today.year() - age, month, day)
}

pub struct IdentityGenerator {
    mailbox: DisposableMailbox,
}

impl IdentityGenerator {
    pub fn new(mailbox: DisposableMailbox) -> Self {
        Self { mailbox }
    }

    pub async fn generate(&self) -> Identity {
        Identity {
            email: self.mailbox.provision().await,
            password: generate_password(),
            birthdate: generate_birthdate(),
        }
    }
}
