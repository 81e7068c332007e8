//! In-memory store used by handler tests.

use anyhow::{anyhow, Result};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{
    CreateUserOutcome, NewUser, ProfileUpdate, SessionRecord, SessionStore, StoredSession, User,
    UserInfo, UserStore,
};
use crate::BoxFuture;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    openids: HashMap<String, i64>,
    /// Record and deadline, in seconds on `clock`.
    sessions: HashMap<Vec<u8>, (SessionRecord, i64)>,
    clock: i64,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn session_count(&self) -> usize {
        self.tables().sessions.len()
    }

    /// Let `seconds` pass for every stored session.
    pub(crate) fn advance_clock(&self, seconds: i64) {
        self.tables().clock += seconds;
    }

    /// Seconds left on each session, in no particular order.
    pub(crate) fn session_lifetimes(&self) -> Vec<i64> {
        let tables = self.tables();
        tables
            .sessions
            .values()
            .map(|(_, deadline)| deadline - tables.clock)
            .collect()
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.tables().users.iter().find(|user| predicate(user)).cloned()
    }
}

impl UserStore for MemoryStore {
    fn find_user_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<User>>> {
        let user = self.find(|user| user.id == id);
        Box::pin(async move { Ok(user) })
    }

    fn find_user_by_slug<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        let user = self.find(|user| user.slug.as_deref() == Some(slug));
        Box::pin(async move { Ok(user) })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
        let user = self.find(|user| user.email == email);
        Box::pin(async move { Ok(user) })
    }

    fn find_user_by_openid<'a>(
        &'a self,
        openid: &'a str,
    ) -> BoxFuture<'a, Result<Option<User>>> {
        let user_id = self.tables().openids.get(openid).copied();
        let user = user_id.and_then(|id| self.find(|user| user.id == id));
        Box::pin(async move { Ok(user) })
    }

    fn create_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, Result<CreateUserOutcome>> {
        let outcome = {
            let mut tables = self.tables();
            if tables.users.iter().any(|existing| existing.email == user.email) {
                CreateUserOutcome::EmailTaken
            } else {
                tables.next_id += 1;
                let id = tables.next_id;
                tables.users.push(User {
                    id,
                    email: user.email.clone(),
                    nickname: user.nickname.clone(),
                    slug: None,
                    password: user.password_hash.clone(),
                    info: UserInfo::default(),
                });
                CreateUserOutcome::Created(id)
            }
        };
        Box::pin(async move { Ok(outcome) })
    }

    fn update_profile<'a>(
        &'a self,
        id: i64,
        update: &'a ProfileUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        let result = {
            let mut tables = self.tables();
            let taken = update.slug.as_deref().is_some_and(|slug| {
                tables
                    .users
                    .iter()
                    .any(|user| user.id != id && user.slug.as_deref() == Some(slug))
            });
            if taken {
                Err(anyhow!(
                    "The slug \"{}\" is already taken",
                    update.slug.as_deref().unwrap_or_default()
                ))
            } else if let Some(user) = tables.users.iter_mut().find(|user| user.id == id) {
                user.nickname.clone_from(&update.nickname);
                if update.slug.is_some() {
                    user.slug.clone_from(&update.slug);
                }
                user.info = update.info.clone();
                Ok(())
            } else {
                Err(anyhow!("User {id} not found"))
            }
        };
        Box::pin(async move { result })
    }

    fn set_password<'a>(&'a self, id: i64, password_hash: &'a str) -> BoxFuture<'a, Result<()>> {
        let result = match self.tables().users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.password = password_hash.to_string();
                Ok(())
            }
            None => Err(anyhow!("User {id} not found")),
        };
        Box::pin(async move { result })
    }

    fn link_openid<'a>(&'a self, openid: &'a str, user_id: i64) -> BoxFuture<'a, Result<()>> {
        self.tables().openids.insert(openid.to_string(), user_id);
        Box::pin(async move { Ok(()) })
    }

    fn ping(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}

impl SessionStore for MemoryStore {
    fn load_session<'a>(
        &'a self,
        token_hash: &'a [u8],
    ) -> BoxFuture<'a, Result<Option<StoredSession>>> {
        let tables = self.tables();
        let stored = tables
            .sessions
            .get(token_hash)
            .map(|(record, deadline)| StoredSession {
                record: record.clone(),
                expires_in: deadline - tables.clock,
            })
            .filter(|stored| stored.expires_in > 0);
        Box::pin(async move { Ok(stored) })
    }

    fn save_session<'a>(
        &'a self,
        token_hash: &'a [u8],
        record: &'a SessionRecord,
        ttl_seconds: i64,
    ) -> BoxFuture<'a, Result<()>> {
        let mut tables = self.tables();
        let deadline = tables.clock + ttl_seconds;
        tables
            .sessions
            .insert(token_hash.to_vec(), (record.clone(), deadline));
        Box::pin(async move { Ok(()) })
    }

    fn touch_session<'a>(&'a self, token_hash: &'a [u8], ttl_seconds: i64) -> BoxFuture<'a, Result<()>> {
        let mut tables = self.tables();
        let deadline = tables.clock + ttl_seconds;
        if let Some((_, expires)) = tables.sessions.get_mut(token_hash) {
            *expires = deadline;
        }
        Box::pin(async move { Ok(()) })
    }

    fn delete_session<'a>(&'a self, token_hash: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        self.tables().sessions.remove(token_hash);
        Box::pin(async move { Ok(()) })
    }

    fn purge_expired_sessions(&self) -> BoxFuture<'_, Result<u64>> {
        let mut tables = self.tables();
        let clock = tables.clock;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, (_, deadline)| *deadline > clock);
        let purged = (before - tables.sessions.len()) as u64;
        Box::pin(async move { Ok(purged) })
    }
}
