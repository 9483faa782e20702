//! The backing store the lookup services read from.
//!
//! Lookups reach their data only through [`Directory::lookup_raw`]: given an
//! identifier, the store answers with a record, a miss, or a [`StoreError`].
//!
//! [`InMemoryDirectory`] is the in-process stand-in used by tests and the
//! demo. Each table can be switched to a [`Behavior`] that simulates a remote
//! fault, and every call is counted in a shared [`CallLog`] so tests can
//! assert how many lookups ran and in what order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::{Address, Country, EntityKind, PostalCode, Record, Region, StoreError, User};

// =============================================================================
// Directory Trait
// =============================================================================

/// Raw access to the stored records of one kind.
pub trait Directory<R: Record>: Send + Sync + 'static {
    /// Looks up the record stored under `id`.
    ///
    /// Returns `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store itself cannot answer.
    fn lookup_raw(&self, id: R::Id) -> Result<Option<R>, StoreError>;
}

/// A store that can serve every step of the chain.
pub trait Backend:
    Directory<User> + Directory<Address> + Directory<PostalCode> + Directory<Region> + Directory<Country>
{
}

impl<T> Backend for T where
    T: Directory<User>
        + Directory<Address>
        + Directory<PostalCode>
        + Directory<Region>
        + Directory<Country>
{
}

// =============================================================================
// Behavior
// =============================================================================

/// How one table of an [`InMemoryDirectory`] answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Behavior {
    /// Answer from the stored rows.
    #[default]
    Normal,
    /// Report a miss for every identifier.
    AlwaysMiss,
    /// Report that `host` cannot be reached.
    Unreachable {
        /// Name of the unreachable host.
        host: String,
    },
    /// Sleep for the given duration, then answer from the stored rows.
    Slow(Duration),
    /// Report that the store gave up after the given duration.
    Elapsed(Duration),
    /// Panic with the given message, simulating a bug in the store.
    Defective(String),
}

// =============================================================================
// Call Log
// =============================================================================

/// How many calls a [`CallLog`] keeps in order unless told otherwise.
pub const DEFAULT_CALL_LOG_LIMIT: usize = 4096;

/// Records `lookup_raw` calls by entity kind.
///
/// Per-kind counts are exact for the life of the log. The ordered record
/// keeps only the latest `limit` calls, dropping the oldest first, so a
/// long-running process holds a bounded log.
///
/// Cloning a `CallLog` shares the underlying record.
#[derive(Debug, Clone)]
pub struct CallLog {
    state: Arc<Mutex<CallLogState>>,
}

#[derive(Debug)]
struct CallLogState {
    recent: VecDeque<EntityKind>,
    counts: [usize; EntityKind::CHAIN_ORDER.len()],
    limit: usize,
}

impl Default for CallLog {
    fn default() -> Self {
        Self::with_limit(DEFAULT_CALL_LOG_LIMIT)
    }
}

impl CallLog {
    /// Creates an empty log keeping [`DEFAULT_CALL_LOG_LIMIT`] calls in order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log keeping at most `limit` calls in order.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CallLogState {
                recent: VecDeque::new(),
                counts: [0; EntityKind::CHAIN_ORDER.len()],
                limit,
            })),
        }
    }

    fn record(&self, kind: EntityKind) {
        let mut state = self.state.lock();
        state.counts[slot(kind)] += 1;
        if state.limit == 0 {
            return;
        }
        if state.recent.len() == state.limit {
            state.recent.pop_front();
        }
        state.recent.push_back(kind);
    }

    /// Returns the retained calls, oldest first.
    pub fn calls(&self) -> Vec<EntityKind> {
        self.state.lock().recent.iter().copied().collect()
    }

    /// Returns how many calls hit the table of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.state.lock().counts[slot(kind)]
    }

    /// Returns the total number of calls.
    pub fn total(&self) -> usize {
        self.state.lock().counts.iter().sum()
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.recent.clear();
        state.counts = [0; EntityKind::CHAIN_ORDER.len()];
    }
}

const fn slot(kind: EntityKind) -> usize {
    match kind {
        EntityKind::User => 0,
        EntityKind::Address => 1,
        EntityKind::PostalCode => 2,
        EntityKind::Region => 3,
        EntityKind::Country => 4,
    }
}

// =============================================================================
// Table
// =============================================================================

struct Table<R: Record> {
    rows: HashMap<R::Id, Vec<R>>,
    behavior: Behavior,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            behavior: Behavior::Normal,
        }
    }
}

impl<R: Record> Table<R> {
    fn insert(&mut self, record: R) {
        self.rows.entry(record.record_id()).or_default().push(record);
    }

    fn lookup(&self, id: R::Id) -> Result<Option<R>, StoreError> {
        match &self.behavior {
            Behavior::Normal => self.rows_for(id),
            Behavior::AlwaysMiss => Ok(None),
            Behavior::Unreachable { host } => Err(StoreError::Unreachable { host: host.clone() }),
            Behavior::Slow(delay) => {
                std::thread::sleep(*delay);
                self.rows_for(id)
            }
            Behavior::Elapsed(after) => Err(StoreError::Elapsed { after: *after }),
            Behavior::Defective(message) => panic!("{message}"),
        }
    }

    fn rows_for(&self, id: R::Id) -> Result<Option<R>, StoreError> {
        match self.rows.get(&id).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([row]) => Ok(Some(row.clone())),
            Some(rows) => Err(StoreError::DuplicateMatches {
                matches: rows.len(),
            }),
        }
    }
}

// =============================================================================
// InMemoryDirectory
// =============================================================================

/// An in-memory [`Backend`] with per-table fault simulation.
///
/// # Examples
///
/// ```rust
/// use run_wild::domain::{EntityKind, User, UserId};
/// use run_wild::service::{Behavior, Directory, InMemoryDirectory};
///
/// let directory = InMemoryDirectory::new()
///     .with_user(User::new(1, 10))
///     .with_behavior(EntityKind::Address, Behavior::AlwaysMiss);
///
/// let found = Directory::<User>::lookup_raw(&directory, UserId::new(1)).unwrap();
/// assert_eq!(found, Some(User::new(1, 10)));
/// assert_eq!(directory.call_log().calls(), vec![EntityKind::User]);
/// ```
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Table<User>,
    addresses: Table<Address>,
    postal_codes: Table<PostalCode>,
    regions: Table<Region>,
    countries: Table<Country>,
    call_log: CallLog,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory holding two complete chains sharing one country:
    ///
    /// - user 1 → address 10 → postal code 20 → region 30 → country 40
    /// - user 5 → address 15 → postal code 25 → region 35 → country 40
    pub fn sample() -> Self {
        Self::new()
            .with_user(User::new(1, 10))
            .with_address(Address::new(10, 20))
            .with_postal_code(PostalCode::new(20, 30))
            .with_region(Region::new(30, 40))
            .with_user(User::new(5, 15))
            .with_address(Address::new(15, 25))
            .with_postal_code(PostalCode::new(25, 35))
            .with_region(Region::new(35, 40))
            .with_country(Country::new(40))
    }

    /// Adds a user row.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user);
        self
    }

    /// Adds an address row.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.insert(address);
        self
    }

    /// Adds a postal code row.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: PostalCode) -> Self {
        self.postal_codes.insert(postal_code);
        self
    }

    /// Adds a region row.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.regions.insert(region);
        self
    }

    /// Adds a country row.
    #[must_use]
    pub fn with_country(mut self, country: Country) -> Self {
        self.countries.insert(country);
        self
    }

    /// Switches the table of `kind` to `behavior`.
    #[must_use]
    pub fn with_behavior(mut self, kind: EntityKind, behavior: Behavior) -> Self {
        match kind {
            EntityKind::User => self.users.behavior = behavior,
            EntityKind::Address => self.addresses.behavior = behavior,
            EntityKind::PostalCode => self.postal_codes.behavior = behavior,
            EntityKind::Region => self.regions.behavior = behavior,
            EntityKind::Country => self.countries.behavior = behavior,
        }
        self
    }

    /// The log of every `lookup_raw` call served so far.
    pub const fn call_log(&self) -> &CallLog {
        &self.call_log
    }
}

macro_rules! impl_directory {
    ($($record:ty => $table:ident),* $(,)?) => {
        $(
            impl Directory<$record> for InMemoryDirectory {
                fn lookup_raw(&self, id: <$record as Record>::Id) -> Result<Option<$record>, StoreError> {
                    let kind = <$record as Record>::KIND;
                    self.call_log.record(kind);
                    tracing::trace!(%kind, %id, behavior = ?self.$table.behavior, "lookup_raw");
                    self.$table.lookup(id)
                }
            }
        )*
    };
}

impl_directory!(
    User => users,
    Address => addresses,
    PostalCode => postal_codes,
    Region => regions,
    Country => countries,
);
