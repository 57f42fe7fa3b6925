use crate::error::CoreResult;
use crate::record::Record;
use crate::store::Store;

/// Visits every record in ascending key order and returns how many were
/// visited.
///
/// The first error, from the store or from `visit`, ends the scan.
pub fn display_all<F>(store: &Store, mut visit: F) -> CoreResult<usize>
where
    F: FnMut(&Record) -> CoreResult<()>,
{
    store.view(|txn| {
        let mut it = txn.iter(store.iterator_options());
        it.rewind()?;

        let mut visited = 0;
        while let Some(record) = it.item() {
            visit(record)?;
            visited += 1;
            it.next()?;
        }
        Ok(visited)
    })
}

/// Looks up a single record. Returns `None` if the key is absent.
pub fn display_one(store: &Store, key: &[u8]) -> CoreResult<Option<Record>> {
    store.view(|txn| match txn.get(key) {
        Ok(value) => Ok(Some(Record::new(key, value))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    })
}

/// Visits every record whose key starts with `prefix`, in ascending order,
/// and returns how many were visited.
///
/// An empty prefix matches every key.
pub fn prefix_scan<F>(store: &Store, prefix: &[u8], mut visit: F) -> CoreResult<usize>
where
    F: FnMut(&Record) -> CoreResult<()>,
{
    store.view(|txn| {
        let mut it = txn.iter(store.iterator_options().prefix(prefix));
        it.seek(prefix)?;

        let mut visited = 0;
        while it.valid_for_prefix(prefix) {
            if let Some(record) = it.item() {
                visit(record)?;
                visited += 1;
            }
            it.next()?;
        }
        Ok(visited)
    })
}

/// Counts the keys in the store.
pub fn count(store: &Store) -> CoreResult<usize> {
    display_all(store, |_| Ok(()))
}
