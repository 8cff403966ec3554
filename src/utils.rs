mod merge ;

pub(crate) use merge::Merge ;

/// Output of an operation that keeps going past individual failures: everything that worked,
/// plus the errors of the parts that were skipped.
pub type PartialSuccess<T, E> = ( T, Vec<E> );
