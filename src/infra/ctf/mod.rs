// CTF infrastructure - SQLite storage implementation

mod sqlite_ctf_store;

pub use sqlite_ctf_store::SqliteCtfStore;
