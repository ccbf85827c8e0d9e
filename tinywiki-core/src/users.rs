//! User accounts stored in a JSON file.
//!
//! ```json
//! { "ana": { "active": true, "authentication_method": "hash", "hash": "...", "roles": ["admin"] } }
//! ```

use crate::error::{Result, WikiError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SALT_LEN: usize = 32;

/// Role that may create and delete accounts.
pub const ADMIN_ROLE: &str = "admin";

/// How a user's password is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationMethod {
    Cleartext,
    #[default]
    Hash,
}

impl std::str::FromStr for AuthenticationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cleartext" => Ok(Self::Cleartext),
            "hash" => Ok(Self::Hash),
            other => Err(format!("unknown authentication method: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub authentication_method: AuthenticationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn set_password(&mut self, password: &str) {
        match self.authentication_method {
            AuthenticationMethod::Cleartext => {
                self.password = Some(password.to_string());
                self.hash = None;
            }
            AuthenticationMethod::Hash => {
                self.hash = Some(make_salted_hash(password));
                self.password = None;
            }
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        match self.authentication_method {
            AuthenticationMethod::Cleartext => self.password.as_deref() == Some(password),
            AuthenticationMethod::Hash => self
                .hash
                .as_deref()
                .is_some_and(|hash| check_hashed_password(password, hash)),
        }
    }
}

fn salted_digest(salt: &[u8], password: &str) -> String {
    let (head, tail) = salt.split_at(salt.len() / 2);
    let mut hasher = Sha512::new();
    hasher.update(head);
    hasher.update(password.as_bytes());
    hasher.update(tail);
    hex::encode(hasher.finalize())
}

/// Salt bytes from hashed v4 uuids, so the fixed version bits do not show.
fn random_salt() -> [u8; SALT_LEN] {
    let mut hasher = Sha512::new();
    for _ in 0..3 {
        hasher.update(uuid::Uuid::new_v4().as_bytes());
    }
    let digest = hasher.finalize();
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest[..SALT_LEN]);
    salt
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `hex(salt) + hex(sha512(salt[..16] + password + salt[16..]))`
pub fn make_salted_hash(password: &str) -> String {
    let salt = random_salt();
    format!("{}{}", hex::encode(salt), salted_digest(&salt, password))
}

pub fn check_hashed_password(password: &str, salted_hash: &str) -> bool {
    if salted_hash.len() <= SALT_LEN * 2 || !salted_hash.is_char_boundary(SALT_LEN * 2) {
        return false;
    }
    let (salt_hex, digest) = salted_hash.split_at(SALT_LEN * 2);
    match hex::decode(salt_hex) {
        Ok(salt) => {
            let expected = salted_digest(&salt, password);
            constant_time_eq(expected.as_bytes(), digest.as_bytes())
        }
        Err(_) => false,
    }
}

/// Names end up in urls and `Location` headers: no `/`, no control characters.
pub fn is_valid_user_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.chars().any(|c| c == '/' || c.is_control())
}

/// Reads and writes the users file.
pub struct UserManager {
    path: PathBuf,
    default_method: AuthenticationMethod,
    lock: Mutex<()>,
}

impl UserManager {
    pub fn new(path: impl Into<PathBuf>, default_method: AuthenticationMethod) -> Self {
        Self {
            path: path.into(),
            default_method,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, User>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut users: BTreeMap<String, User> = serde_json::from_str(&raw)?;
        for (name, user) in users.iter_mut() {
            user.name = name.clone();
        }
        Ok(users)
    }

    fn write(&self, users: &BTreeMap<String, User>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(users)?)?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<User>> {
        Ok(self.read()?.into_values().collect())
    }

    pub fn get_user(&self, name: &str) -> Result<Option<User>> {
        Ok(self.read()?.remove(name))
    }

    pub fn add_user(
        &self,
        name: &str,
        password: &str,
        active: bool,
        roles: Vec<String>,
        method: Option<AuthenticationMethod>,
    ) -> Result<User> {
        if !is_valid_user_name(name) {
            return Err(WikiError::InvalidUserName(name.to_string()));
        }
        let _guard = self.lock.lock();
        let mut users = self.read()?;
        if users.contains_key(name) {
            return Err(WikiError::UserExists(name.to_string()));
        }

        let mut user = User {
            name: name.to_string(),
            active,
            authentication_method: method.unwrap_or(self.default_method),
            password: None,
            hash: None,
            roles,
        };
        user.set_password(password);
        users.insert(name.to_string(), user.clone());
        self.write(&users)?;

        tracing::info!(user = %name, "user added");
        Ok(user)
    }

    pub fn update(&self, user: &User) -> Result<()> {
        let _guard = self.lock.lock();
        let mut users = self.read()?;
        if !users.contains_key(&user.name) {
            return Err(WikiError::UserNotFound(user.name.clone()));
        }
        users.insert(user.name.clone(), user.clone());
        self.write(&users)
    }

    pub fn delete_user(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut users = self.read()?;
        if users.remove(name).is_none() {
            return Ok(false);
        }
        self.write(&users)?;

        tracing::info!(user = %name, "user deleted");
        Ok(true)
    }

    /// Look up an active user with a matching password.
    pub fn authenticate(&self, name: &str, password: &str) -> Result<Option<User>> {
        Ok(self
            .get_user(name)?
            .filter(|user| user.active && user.check_password(password)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_salted_hash_roundtrip() {
        let hash = make_salted_hash("hunter2");
        assert_eq!(hash.len(), SALT_LEN * 2 + 128);
        assert!(check_hashed_password("hunter2", &hash));
        assert!(!check_hashed_password("hunter3", &hash));
        assert_ne!(hash, make_salted_hash("hunter2"));
    }

    #[test]
    fn test_salt_has_no_fixed_bits() {
        // A raw v4 uuid always has 4 as the high nibble of byte 6.
        let nibbles: std::collections::BTreeSet<u8> =
            (0..64).map(|_| random_salt()[6] >> 4).collect();
        assert!(nibbles.len() > 1);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!check_hashed_password("x", "short"));
        assert!(!check_hashed_password("x", &"z".repeat(200)));
    }

    #[test]
    fn test_add_and_authenticate() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);

        users
            .add_user("ana", "secret", true, vec!["admin".into()], None)
            .unwrap();

        let ana = users.authenticate("ana", "secret").unwrap().unwrap();
        assert!(ana.is_admin());
        assert!(ana.password.is_none());
        assert!(users.authenticate("ana", "wrong").unwrap().is_none());
        assert!(users.authenticate("nobody", "secret").unwrap().is_none());
    }

    #[test]
    fn test_cleartext_method() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);
        users
            .add_user("bo", "pw", true, vec![], Some(AuthenticationMethod::Cleartext))
            .unwrap();

        let raw = std::fs::read_to_string(users.path()).unwrap();
        assert!(raw.contains("\"authentication_method\": \"cleartext\""));
        assert!(users.authenticate("bo", "pw").unwrap().is_some());
    }

    #[test]
    fn test_inactive_user_cannot_authenticate() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);
        users.add_user("cy", "pw", false, vec![], None).unwrap();
        assert!(users.authenticate("cy", "pw").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_and_delete() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);
        users.add_user("dee", "pw", true, vec![], None).unwrap();

        assert!(matches!(
            users.add_user("dee", "pw", true, vec![], None),
            Err(WikiError::UserExists(_))
        ));
        assert!(users.delete_user("dee").unwrap());
        assert!(!users.delete_user("dee").unwrap());
        assert!(users.list().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);
        for name in ["", "  ", "a/b", "eve\u{1}", "line\nbreak"] {
            assert!(matches!(
                users.add_user(name, "pw", true, vec![], None),
                Err(WikiError::InvalidUserName(_))
            ));
        }
        assert!(!users.path().exists());
        assert!(is_valid_user_name("Ana Lucia"));
    }

    #[test]
    fn test_update_roles() {
        let dir = tempdir().unwrap();
        let users = UserManager::new(dir.path().join("users.json"), AuthenticationMethod::Hash);
        let mut eve = users.add_user("eve", "pw", true, vec![], None).unwrap();
        eve.roles.push("admin".into());
        users.update(&eve).unwrap();

        assert!(users.get_user("eve").unwrap().unwrap().is_admin());
    }
}
