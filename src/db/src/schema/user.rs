use super::{NewProfileImage, NewUser, ProfileImage, User, UserPatch};
use crate::error::{Error, Result};
use std::convert::{TryFrom, TryInto};

#[derive(Copy, Clone, Debug, PartialEq, Eq, postgres_types::ToSql, postgres_types::FromSql)]
#[repr(i16)]
pub enum Role {
    User,
    Staff,
    Admin,
    __Last,
}

impl Role {
    pub const fn as_int(self) -> i16 {
        self as i16
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> i16 {
        role.as_int()
    }
}

#[derive(Debug)]
pub struct UnknownRoleError;

impl std::fmt::Display for UnknownRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "unknown user role")
    }
}

impl std::error::Error for UnknownRoleError {}

impl TryFrom<i16> for Role {
    type Error = UnknownRoleError;

    fn try_from(d: i16) -> Result<Role, UnknownRoleError> {
        if d < 0 || d >= (Role::__Last as i16) {
            return Err(UnknownRoleError);
        }
        Ok(unsafe { std::mem::transmute(d) })
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Role, UnknownRoleError> {
        match s {
            "USER" => Ok(Role::User),
            "STAFF" => Ok(Role::Staff),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(UnknownRoleError),
        }
    }
}

impl User {
    pub fn role(&self) -> Role {
        self.role.try_into().expect("invalid role in users row")
    }

    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> User {
        Self {
            id: row.get("id"),
            full_name: row.get("full_name"),
            nickname: row.get("nickname"),
            email: row.get("email"),
            password: row.get("password"),
            about: row.get("about"),
            join_date: row.get("join_date"),
            last_login: row.get("last_login"),
            task_stars_received: row.get("task_stars_received"),
            solution_stars_received: row.get("solution_stars_received"),
            role: row.get("role"),
        }
    }
}

impl NewUser {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.nickname.is_empty() {
            return Err(Error::validation("nickname", &self.nickname, "must not be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::validation("password", "", "must not be empty"));
        }
        Ok(())
    }
}

impl UserPatch {
    pub fn full_name(&mut self, full_name: String) -> &mut Self {
        self.full_name = Some(full_name);
        self
    }

    pub fn email(&mut self, email: String) -> &mut Self {
        self.email = Some(email);
        self
    }

    pub fn about(&mut self, about: String) -> &mut Self {
        self.about = Some(about);
        self
    }

    pub fn password(&mut self, password: String) -> &mut Self {
        self.password = Some(password);
        self
    }

    pub fn last_login(&mut self, at: chrono::NaiveDateTime) -> &mut Self {
        self.last_login = Some(at);
        self
    }

    pub fn role(&mut self, role: Role) -> &mut Self {
        self.role = Some(role.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(password) = &self.password {
            if password.is_empty() {
                return Err(Error::validation("password", "", "must not be empty"));
            }
        }
        Ok(())
    }
}

impl ProfileImage {
    pub(crate) fn from_pg_row(row: tokio_postgres::Row) -> ProfileImage {
        Self {
            id: row.get("id"),
            user_id: row.get("user_id"),
            fields: super::ImageFields {
                name: row.get("name"),
                content: row.get("content"),
            },
            upload_date: row.get("upload_date"),
        }
    }
}

impl NewProfileImage {
    pub(crate) fn validate(&self) -> Result<()> {
        self.fields.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_bounds() {
        assert!(Role::try_from(-1).is_err());
        assert!(Role::try_from(Role::__Last as i16).is_err());
        assert_eq!(Role::try_from(0).unwrap(), Role::User);
        assert_eq!(Role::try_from(2).unwrap(), Role::Admin);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("STAFF".parse::<Role>().unwrap(), Role::Staff);
        assert!("staff".parse::<Role>().is_err());
    }
}
