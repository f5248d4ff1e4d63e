//! Picklers of primitive and standard library types.
//!
//! | type | entry |
//! |---|---|
//! | `bool`, `char`, integers, floats, `()` | leaf with one primitive payload |
//! | `String` | leaf with a string payload |
//! | `Vec<T>` | field `len` (`u64`), then one `elem` field per element |
//! | `BTreeMap<K, V>` | field `len`, then `key` / `value` pairs |
//! | tuples up to 4 | fields `0`, `1`, ... |
//! | `Option<T>` | `Null` entry, or the entry of the value |
//! | `Box<T>`, `RefCell<T>`, `Mutex<T>`, `RwLock<T>` | the entry of the value |
//! | `Rc<T>`, `Arc<T>` | the entry of the value on first visit, then `Ref` entries |

mod collections;
mod primitive;
mod shared;
mod wrappers;
