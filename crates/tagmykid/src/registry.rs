//! Tag creation and listing for a signed-in account.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{Error, Field, Result};
use crate::model::{Account, Session, Tag, TagDraft};
use crate::storage::IdentityStore;
use crate::validate;

/// Characters a tag code is drawn from.
pub const CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a random tag code.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..validate::CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Creates and lists tags under the session's account.
#[derive(Debug)]
pub struct TagRegistry<S> {
    accounts: S,
    code_attempts: u32,
}

impl<S: IdentityStore> TagRegistry<S> {
    /// Create a registry that takes the first generated code as is.
    #[must_use]
    pub fn new(accounts: S) -> Self {
        Self {
            accounts,
            code_attempts: 1,
        }
    }

    /// Regenerate a code up to `attempts` times while it collides with a
    /// stored one. With one attempt no collision check is made.
    #[must_use]
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    /// Validate `draft` and append a new tag to the session's account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] without a session, a validation
    /// error naming the first bad field, or [`Error::DuplicateTag`] if the
    /// account already has a tag for this child.
    pub fn create_tag(&self, session: Option<&Session>, draft: &TagDraft) -> Result<Tag> {
        self.create_tag_with(session, draft, &mut rand::thread_rng())
    }

    /// [`create_tag`](Self::create_tag) with a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// Same as [`create_tag`](Self::create_tag).
    pub fn create_tag_with<R: Rng + ?Sized>(
        &self,
        session: Option<&Session>,
        draft: &TagDraft,
        rng: &mut R,
    ) -> Result<Tag> {
        let session = session.ok_or(Error::Unauthenticated)?;

        let name = validate::required(Field::ChildName, &draft.name)?;
        let grade = validate::grade(&draft.grade)?;
        let class_name = validate::class_name(&draft.class_name)?;
        let parent_phone = validate::phone(Field::ParentPhone, &draft.parent_phone)?;

        let mut account = self.owned_account(session)?;
        if is_duplicate(&account, &name, &grade, &class_name) {
            return Err(Error::DuplicateTag {
                name,
                grade,
                class_name,
            });
        }

        let code = self.next_code(rng)?;
        let tag = Tag {
            name,
            grade,
            class_name,
            parent_phone,
            school: session.school.clone(),
            code,
        };

        account.tags.push(tag.clone());
        self.accounts.put(&session.phone, &account)?;

        info!(code = %tag.code, phone = %session.phone, "Created tag");
        Ok(tag)
    }

    /// The session account's tags in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] without a session.
    pub fn list_tags(&self, session: Option<&Session>) -> Result<Vec<Tag>> {
        let session = session.ok_or(Error::Unauthenticated)?;
        Ok(self.owned_account(session)?.tags)
    }

    /// One of the session account's tags by code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] without a session or
    /// [`Error::NotFound`] if the account owns no such tag.
    pub fn find_own_tag(&self, session: Option<&Session>, code: &str) -> Result<Tag> {
        let session = session.ok_or(Error::Unauthenticated)?;
        self.owned_account(session)?
            .find_tag(code.trim())
            .cloned()
            .ok_or_else(|| Error::NotFound {
                code: code.trim().to_uppercase(),
            })
    }

    // A session whose account has vanished from the store is treated as
    // signed out.
    fn owned_account(&self, session: &Session) -> Result<Account> {
        self.accounts
            .get(&session.phone)?
            .ok_or(Error::Unauthenticated)
    }

    fn next_code<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        let mut code = generate_code(rng);
        if self.code_attempts <= 1 {
            debug!(code = %code, "Generated tag code");
            return Ok(code);
        }

        for attempt in 1..self.code_attempts {
            if !self.code_in_use(&code)? {
                break;
            }
            warn!(code = %code, attempt, "Tag code collision, regenerating");
            code = generate_code(rng);
        }
        debug!(code = %code, "Generated tag code");
        Ok(code)
    }

    fn code_in_use(&self, code: &str) -> Result<bool> {
        Ok(self
            .accounts
            .scan()?
            .any(|(_, account)| account.find_tag(code).is_some()))
    }
}

fn is_duplicate(account: &Account, name: &str, grade: &str, class_name: &str) -> bool {
    let grade = validate::grade_value(grade);
    account.tags.iter().any(|tag| {
        tag.name.trim().to_lowercase() == name.to_lowercase()
            && validate::grade_value(&tag.grade) == grade
            && tag.class_name.eq_ignore_ascii_case(class_name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::storage::MemoryStore;

    const PHONE: &str = "0821234567";

    fn setup() -> (MemoryStore, Session) {
        let store = MemoryStore::new();
        let account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        store.put(PHONE, &account).unwrap();
        let session = Session::for_account(PHONE, &account);
        (store, session)
    }

    fn thandi() -> TagDraft {
        TagDraft::new("Thandi Dlamini", "5", "b", "0827654321")
    }

    #[test]
    fn test_generate_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_create_tag() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);

        let tag = registry.create_tag(Some(&session), &thandi()).unwrap();
        assert_eq!(tag.name, "Thandi Dlamini");
        assert_eq!(tag.grade, "5");
        assert_eq!(tag.class_name, "B");
        assert_eq!(tag.parent_phone, "0827654321");
        assert_eq!(tag.school, "Greenside High School");
        assert_eq!(tag.code.len(), 6);

        let stored = store.get(PHONE).unwrap().unwrap();
        assert_eq!(stored.tags, vec![tag]);
    }

    #[test]
    fn test_create_tag_requires_session() {
        let (store, _session) = setup();
        let registry = TagRegistry::new(&store);
        assert!(matches!(
            registry.create_tag(None, &thandi()),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_create_tag_validation_names_field() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        let cases = [
            (TagDraft::new("", "5", "B", "0827654321"), Field::ChildName),
            (TagDraft::new("Thandi", "13", "B", "0827654321"), Field::Grade),
            (TagDraft::new("Thandi", "5", "BB", "0827654321"), Field::ClassName),
            (TagDraft::new("Thandi", "5", "B", "0827"), Field::ParentPhone),
        ];

        for (draft, field) in cases {
            let err = registry.create_tag(Some(&session), &draft).unwrap_err();
            assert_eq!(err.field(), Some(field), "{draft:?}");
        }
        assert!(store.get(PHONE).unwrap().unwrap().tags.is_empty());
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        registry.create_tag(Some(&session), &thandi()).unwrap();

        let again = TagDraft::new("thandi dlamini", "5", "B", "0830000000");
        let err = registry.create_tag(Some(&session), &again).unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { .. }));
        assert_eq!(store.get(PHONE).unwrap().unwrap().tags.len(), 1);
    }

    #[test]
    fn test_duplicate_compares_grades_numerically() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        registry.create_tag(Some(&session), &thandi()).unwrap();

        let padded = TagDraft::new("Thandi Dlamini", "05", "b", "0827654321");
        assert!(matches!(
            registry.create_tag(Some(&session), &padded),
            Err(Error::DuplicateTag { .. })
        ));
    }

    #[test]
    fn test_same_child_different_class_is_allowed() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        registry.create_tag(Some(&session), &thandi()).unwrap();

        let other = TagDraft::new("Thandi Dlamini", "5", "C", "0827654321");
        assert!(registry.create_tag(Some(&session), &other).is_ok());
    }

    #[test]
    fn test_same_child_under_two_accounts() {
        let (store, session) = setup();
        let other_account = Account::new("xyz789", "John", "Doe", "Rosebank Primary School");
        store.put("0831112222", &other_account).unwrap();
        let other_session = Session::for_account("0831112222", &other_account);

        let registry = TagRegistry::new(&store);
        registry.create_tag(Some(&session), &thandi()).unwrap();
        let tag = registry.create_tag(Some(&other_session), &thandi()).unwrap();
        assert_eq!(tag.school, "Rosebank Primary School");
    }

    #[test]
    fn test_list_tags_in_creation_order() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        let first = registry.create_tag(Some(&session), &thandi()).unwrap();
        let second = registry
            .create_tag(
                Some(&session),
                &TagDraft::new("Sipho Dlamini", "2", "a", "0827654321"),
            )
            .unwrap();

        assert_eq!(registry.list_tags(Some(&session)).unwrap(), vec![first, second]);
        assert!(matches!(
            registry.list_tags(None),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_find_own_tag() {
        let (store, session) = setup();
        let registry = TagRegistry::new(&store);
        let tag = registry.create_tag(Some(&session), &thandi()).unwrap();

        let found = registry
            .find_own_tag(Some(&session), &tag.code.to_lowercase())
            .unwrap();
        assert_eq!(found, tag);
        assert!(matches!(
            registry.find_own_tag(Some(&session), "ZZZZZZ"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_session_for_missing_account() {
        let store = MemoryStore::new();
        let account = Account::new("abc123", "Jane", "Doe", "Greenside High School");
        let session = Session::for_account(PHONE, &account);

        let registry = TagRegistry::new(&store);
        assert!(matches!(
            registry.create_tag(Some(&session), &thandi()),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_retry_avoids_known_collision() {
        let (store, session) = setup();

        // Same seed produces the same first code, so the second registry
        // must regenerate.
        let first = TagRegistry::new(&store)
            .create_tag_with(Some(&session), &thandi(), &mut StdRng::seed_from_u64(42))
            .unwrap();

        let registry = TagRegistry::new(&store).with_code_attempts(5);
        let second = registry
            .create_tag_with(
                Some(&session),
                &TagDraft::new("Sipho Dlamini", "2", "A", "0827654321"),
                &mut StdRng::seed_from_u64(42),
            )
            .unwrap();
        assert_ne!(first.code, second.code);
    }

    #[test]
    fn test_single_attempt_keeps_colliding_code() {
        crate::logging::init_test_logging();

        let (store, session) = setup();
        let first = TagRegistry::new(&store)
            .create_tag_with(Some(&session), &thandi(), &mut StdRng::seed_from_u64(42))
            .unwrap();
        let second = TagRegistry::new(&store)
            .create_tag_with(
                Some(&session),
                &TagDraft::new("Sipho Dlamini", "2", "A", "0827654321"),
                &mut StdRng::seed_from_u64(42),
            )
            .unwrap();
        assert_eq!(first.code, second.code);
    }
}
