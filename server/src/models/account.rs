use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::UnknownVariant;

pub const DEFAULT_MEMBER_ROLE: &str = "Member";

/// Which population an account belongs to. Emails are unique per kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Committee accounts that sign in to the admin dashboard.
    User,
    Member,
    /// The administrator identity messages are exchanged with. Cannot log in.
    System,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Member => "member",
            AccountKind::System => "system",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(AccountKind::User),
            "member" => Ok(AccountKind::Member),
            "system" => Ok(AccountKind::System),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for AccountKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user, member or system account.
///
/// Users carry `college` and `committee`; members carry `name`, `role`,
/// `avatar_url`, `points` and `joined_date`. Fields that do not apply to the
/// kind are `None`.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct Account {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: AccountKind,
    pub email: String,
    pub contact: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub verification_expires: Option<DateTime<Utc>>,
    pub college: Option<String>,
    pub committee: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
    pub points: Option<i32>,
    pub joined_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// An unverified account with no profile fields set.
    pub fn new(
        kind: AccountKind,
        email: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            email,
            contact: String::new(),
            password_hash,
            is_verified: false,
            verification_code: None,
            verification_expires: None,
            college: None,
            committee: None,
            name: None,
            role: None,
            avatar_url: None,
            points: None,
            joined_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_profile(&mut self, profile: AccountProfile, now: DateTime<Utc>) {
        match profile {
            AccountProfile::User {
                college,
                committee,
                contact,
            } => {
                self.college = Some(college);
                self.committee = Some(committee);
                self.contact = contact;
            }
            AccountProfile::Member { name, contact } => {
                self.name = Some(name);
                self.contact = contact;
                self.role.get_or_insert_with(|| DEFAULT_MEMBER_ROLE.to_string());
                self.avatar_url.get_or_insert_with(String::new);
                self.points.get_or_insert(0);
                self.joined_date.get_or_insert(now);
            }
        }
        self.updated_at = now;
    }
}

/// Kind-specific profile data collected at registration.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountProfile {
    User {
        college: String,
        committee: String,
        contact: String,
    },
    Member {
        name: String,
        contact: String,
    },
}

/// Body of `POST /auth/register` and `POST /member/register`. Which fields are
/// required depends on the account kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountRequest {
    pub college: Option<String>,
    pub committee: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResendCodeRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of a member returned on login.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&Account> for MemberSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone().unwrap_or_default(),
            email: account.email.clone(),
            role: account
                .role
                .clone()
                .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_profile_fills_member_defaults() {
        let now = Utc::now();
        let mut account =
            Account::new(AccountKind::Member, "m@example.com".into(), "h".into(), now);
        account.apply_profile(
            AccountProfile::Member {
                name: "Ravi".into(),
                contact: "12345".into(),
            },
            now,
        );

        assert_eq!(account.role.as_deref(), Some(DEFAULT_MEMBER_ROLE));
        assert_eq!(account.points, Some(0));
        assert_eq!(account.joined_date, Some(now));
        assert!(account.college.is_none());
    }

    #[test]
    fn test_reapplying_member_profile_keeps_role_and_points() {
        let now = Utc::now();
        let mut account =
            Account::new(AccountKind::Member, "m@example.com".into(), "h".into(), now);
        account.role = Some("Lead".into());
        account.points = Some(40);
        account.apply_profile(
            AccountProfile::Member {
                name: "Ravi".into(),
                contact: "12345".into(),
            },
            now,
        );

        assert_eq!(account.role.as_deref(), Some("Lead"));
        assert_eq!(account.points, Some(40));
    }

    #[test]
    fn test_kind_round_trips_through_text() {
        for kind in [AccountKind::User, AccountKind::Member, AccountKind::System] {
            assert_eq!(AccountKind::try_from(kind.to_string()), Ok(kind));
        }
        assert!("admin".parse::<AccountKind>().is_err());
    }
}
