//! Account manager with a signed-in user cache.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheCapacities, CacheRegistry};
use crate::database::{Datastore, Major, Role, User};
use crate::error::{RegistrarError, Result};

use super::cache_aside::{
    confirm_exists, read_listing, read_through, require_parent, write_existing, write_new,
    EntityCache,
};
use super::UniversityManager;

/// Manager for user accounts, keyed by university id.
pub struct UserManager {
    store: Datastore,
    university: Arc<UniversityManager>,
    users: EntityCache<User>,
}

impl UserManager {
    pub fn new(
        store: Datastore,
        university: Arc<UniversityManager>,
        caches: &CacheRegistry,
        capacities: &CacheCapacities,
    ) -> Self {
        Self {
            store,
            university,
            users: caches.get_or_create("accounts.users", capacities.users),
        }
    }

    pub fn get_user(&self, university_id: &str) -> Result<User> {
        let key = university_id.to_string();
        read_through(&self.users, &self.store, &key, "get_user", |db| {
            db.get_user(university_id)
        })
    }

    /// Every user holding `role`.
    pub fn get_users(&self, role: Role) -> Result<Vec<User>> {
        read_listing(
            &self.users,
            &self.store,
            "get_users_by_role",
            |u| u.role == role,
            |db| db.get_users_by_role(role),
        )
    }

    pub fn user_exists(&self, university_id: &str) -> Result<bool> {
        confirm_exists(&self.users, &self.store, &university_id.to_string(), "does_user_exist", |db| {
            db.does_user_exist(university_id)
        })
    }

    pub fn add_user(&self, user: &User) -> Result<()> {
        if self.user_exists(&user.university_id)? {
            return Err(RegistrarError::duplicate::<User>(&user.university_id));
        }
        self.check_major(user)?;
        write_new(&self.users, &self.store, user, "add_user", |db, u| db.add_user(u))
    }

    pub fn modify_user(&self, user: &User) -> Result<()> {
        self.check_major(user)?;
        write_existing(&self.users, &self.store, user, "modify_user", |db, u| db.modify_user(u))
    }

    pub fn has_user_cached(&self, university_id: &str) -> bool {
        self.users.contains(&university_id.to_string())
    }

    /// Drop the signed-out user's cached account.
    ///
    /// Returns `true` if an entry was removed.
    pub fn logout(&self, university_id: &str) -> bool {
        let removed = self.users.invalidate(&university_id.to_string());
        debug!("Logout {}: cache entry removed = {}", university_id, removed);
        removed
    }

    fn check_major(&self, user: &User) -> Result<()> {
        match user.major_id {
            Some(major_id) => {
                require_parent::<Major>(self.university.major_exists(major_id)?, &major_id)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Degree, Department, EntityKind, MemoryStore, School, Store, StoreError};

    fn setup() -> (UserManager, MemoryStore) {
        let backend = MemoryStore::new();
        backend.add_school(&School::new(1, "Engineering")).unwrap();
        backend.add_department(&Department::new(10, 1, "CS", "Computer Science")).unwrap();
        backend.add_major(&Major::new(100, 10, "Computer Science", Degree::Bachelor)).unwrap();

        let store = Datastore::new(backend.clone());
        let caches = CacheRegistry::new();
        let capacities = CacheCapacities::uniform(3);
        let university = Arc::new(UniversityManager::new(store.clone(), &caches, &capacities));
        (UserManager::new(store, university, &caches, &capacities), backend)
    }

    fn student(id: &str, last: &str) -> User {
        User::new(id, "Ada", last, format!("{id}@uni.edu"), Role::Student)
    }

    #[test]
    fn test_repeat_reads_hit_cache() {
        let (m, backend) = setup();
        backend.add_user(&student("u1", "Lovelace")).unwrap();

        m.get_user("u1").unwrap();
        m.get_user("u1").unwrap();
        assert_eq!(backend.calls("get_user"), 1);
    }

    #[test]
    fn test_missing_user_is_not_cached() {
        let (m, backend) = setup();
        let err = m.get_user("ghost").unwrap_err();
        assert_eq!(
            err,
            RegistrarError::EntityNotFound { kind: EntityKind::User, key: "ghost".into() }
        );
        assert!(!m.has_user_cached("ghost"));
        m.get_user("ghost").unwrap_err();
        assert_eq!(backend.calls("get_user"), 2);
    }

    #[test]
    fn test_logout_evicts_and_next_read_reloads() {
        let (m, backend) = setup();
        m.add_user(&student("u1", "Lovelace")).unwrap();
        assert!(m.has_user_cached("u1"));

        assert!(m.logout("u1"));
        assert!(!m.has_user_cached("u1"));
        assert!(!m.logout("u1"));

        m.get_user("u1").unwrap();
        assert_eq!(backend.calls("get_user"), 1);
    }

    #[test]
    fn test_add_user_with_unknown_major() {
        let (m, backend) = setup();
        let err = m.add_user(&student("u1", "Lovelace").with_major(999)).unwrap_err();
        assert_eq!(
            err,
            RegistrarError::EntityNotFound { kind: EntityKind::Major, key: "999".into() }
        );
        assert_eq!(backend.calls("add_user"), 0);

        m.add_user(&student("u2", "Hopper").with_major(100)).unwrap();
        assert_eq!(m.get_user("u2").unwrap().major_id, Some(100));
    }

    #[test]
    fn test_store_constraint_propagates_unchanged() {
        let (m, _backend) = setup();
        m.add_user(&student("u1", "Lovelace")).unwrap();
        let mut clash = student("u2", "Hopper");
        clash.email = "u1@uni.edu".into();

        let err = m.add_user(&clash).unwrap_err();
        assert!(matches!(err, RegistrarError::Store(StoreError::Constraint { .. })));
        assert!(!m.has_user_cached("u2"));
    }

    #[test]
    fn test_unavailable_store_surfaces() {
        let (m, backend) = setup();
        backend.set_offline(true);
        let err = m.get_user("u1").unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_users_by_role_sorted_by_name() {
        let (m, backend) = setup();
        m.add_user(&student("u2", "Turing")).unwrap();
        backend.add_user(&student("u1", "Babbage")).unwrap();
        backend
            .add_user(&User::new("f1", "Grace", "Hopper", "f1@uni.edu", Role::Faculty))
            .unwrap();

        let students = m.get_users(Role::Student).unwrap();
        let names: Vec<&str> = students.iter().map(|u| u.last_name.as_str()).collect();
        assert_eq!(names, ["Babbage", "Turing"]);
    }
}
