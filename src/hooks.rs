//! Interception points.
//!
//! A [`HookPoint`] wraps one operation of the host. Interceptors registered on it run before
//! the operation, highest priority first (registration order among equal priorities), and
//! may inspect or modify its arguments. An interceptor can also short-circuit the call by
//! returning [`HookFlow::Replace`], in which case neither the remaining interceptors nor
//! the operation itself run.
//!
//! At most one interceptor per hook point may be exclusive; exclusive interceptors are meant
//! for plugins that take over an operation entirely.
//!
//! # Example
//!
//! ```
//! use wasm_plugin_loader::{ HookPoint, HookFlow, Interceptor };
//!
//! let mut greet = HookPoint::<String, String>::new( "greet" );
//! greet.register( Interceptor::new( "shouting", | name: &mut String | {
//! 	*name = name.to_uppercase();
//! 	HookFlow::Continue
//! })).unwrap();
//!
//! let greeting = greet.invoke( &mut "world".to_string(), | name | format!( "hello {}", name ));
//! assert_eq!( greeting, "hello WORLD" );
//! ```

use thiserror::Error ;



/// What an interceptor decided.
#[derive( Clone, Debug, PartialEq, Eq )]
pub enum HookFlow<R> {
	/// Run the next interceptor, or the operation.
	Continue,
	/// Skip everything else and return this value.
	Replace( R ),
}

#[derive( Debug, Error )]
pub enum HookError {
	/// A second exclusive interceptor was registered.
	#[error( "Hook '{hook}' is already taken over by '{owner}'; '{rejected}' was refused" )]
	Conflict { hook: String, owner: String, rejected: String },
}

type Callback<A, R> = Box<dyn Fn( &mut A ) -> HookFlow<R> + Send + Sync> ;

/// A callback registered on a [`HookPoint`].
pub struct Interceptor<A, R> {
	owner: String,
	priority: i32,
	exclusive: bool,
	callback: Callback<A, R>,
}

impl<A, R> Interceptor<A, R> {

	/// An interceptor with priority `0`, owned by `owner` (usually a plugin's unique name).
	pub fn new( owner: impl Into<String>, callback: impl Fn( &mut A ) -> HookFlow<R> + Send + Sync + 'static ) -> Self {
		Self { owner: owner.into(), priority: 0, exclusive: false, callback: Box::new( callback ) }
	}

	pub fn with_priority( mut self, priority: i32 ) -> Self {
		self.priority = priority ;
		self
	}

	pub fn exclusive( mut self ) -> Self {
		self.exclusive = true ;
		self
	}

	#[inline] pub fn owner( &self ) -> &str { &self.owner }
	#[inline] pub fn priority( &self ) -> i32 { self.priority }
	#[inline] pub fn is_exclusive( &self ) -> bool { self.exclusive }

}

impl<A, R> std::fmt::Debug for Interceptor<A, R> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Interceptor" )
			.field( "owner", &self.owner )
			.field( "priority", &self.priority )
			.field( "exclusive", &self.exclusive )
			.finish_non_exhaustive()
	}
}

/// An interceptable operation taking `&mut A` and producing `R`.
#[derive( Debug )]
pub struct HookPoint<A, R> {
	name: String,
	interceptors: Vec<Interceptor<A, R>>,
}

impl<A, R> HookPoint<A, R> {

	pub fn new( name: impl Into<String> ) -> Self {
		Self { name: name.into(), interceptors: Vec::with_capacity( 0 ) }
	}

	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn is_empty( &self ) -> bool { self.interceptors.is_empty() }

	/// Owners of the registered interceptors, in the order they run.
	pub fn owners( &self ) -> impl Iterator<Item = &str> { self.interceptors.iter().map( Interceptor::owner )}

	/// Adds an interceptor.
	///
	/// # Errors
	/// Fails with [`HookError::Conflict`] if `interceptor` is exclusive and another exclusive
	/// interceptor is already registered.
	pub fn register( &mut self, interceptor: Interceptor<A, R> ) -> Result<(), HookError> {

		let taken = interceptor.exclusive
			.then(|| self.interceptors.iter().find(| existing | existing.exclusive ))
			.flatten();
		if let Some( existing ) = taken {
			return Err( HookError::Conflict {
				hook: self.name.clone(),
				owner: existing.owner.clone(),
				rejected: interceptor.owner,
			});
		}

		let position = self.interceptors.iter()
			.position(| existing | existing.priority < interceptor.priority )
			.unwrap_or( self.interceptors.len() );
		tracing::trace!( hook = %self.name, owner = %interceptor.owner, priority = interceptor.priority, "Registered interceptor" );
		self.interceptors.insert( position, interceptor );
		Ok(())

	}

	/// Removes every interceptor owned by `owner` and returns how many there were.
	pub fn unregister( &mut self, owner: &str ) -> usize {
		let before = self.interceptors.len();
		self.interceptors.retain(| interceptor | interceptor.owner != owner );
		before - self.interceptors.len()
	}

	/// Runs the interceptors, then `operation` unless one of them replaced the result.
	pub fn invoke( &self, args: &mut A, operation: impl FnOnce( &mut A ) -> R ) -> R {
		for interceptor in &self.interceptors {
			if let HookFlow::Replace( result ) = ( interceptor.callback )( args ) {
				tracing::debug!( hook = %self.name, owner = %interceptor.owner, "Interceptor replaced the result" );
				return result
			}
		}
		operation( args )
	}

}

#[cfg( test )]
mod tests {

	use super::* ;

	fn recorder( owner: &'static str ) -> Interceptor<Vec<&'static str>, usize> {
		Interceptor::new( owner, move | log: &mut Vec<&'static str> | { log.push( owner ); HookFlow::Continue })
	}

	#[test]
	fn interceptors_run_by_descending_priority_then_registration() {
		let mut hook = HookPoint::new( "test" );
		hook.register( recorder( "low" ).with_priority( -1 )).unwrap();
		hook.register( recorder( "first" )).unwrap();
		hook.register( recorder( "high" ).with_priority( 5 )).unwrap();
		hook.register( recorder( "second" )).unwrap();
		let mut log = Vec::new();
		let count = hook.invoke( &mut log, | log | log.len() );
		assert_eq!( log, vec![ "high", "first", "second", "low" ]);
		assert_eq!( count, 4 );
	}

	#[test]
	fn replacement_skips_the_rest() {
		let mut hook = HookPoint::new( "test" );
		hook.register( Interceptor::new( "stop", | _: &mut Vec<&'static str> | HookFlow::Replace( 42 )).with_priority( 1 )).unwrap();
		hook.register( recorder( "never" )).unwrap();
		let mut log = Vec::new();
		assert_eq!( hook.invoke( &mut log, | _ | 0 ), 42 );
		assert!( log.is_empty() );
	}

	#[test]
	fn second_exclusive_interceptor_is_refused() {
		let mut hook = HookPoint::new( "test" );
		hook.register( recorder( "a" ).exclusive() ).unwrap();
		hook.register( recorder( "b" )).unwrap();
		let err = hook.register( recorder( "c" ).exclusive() ).unwrap_err();
		assert!( matches!( err, HookError::Conflict { ref owner, ref rejected, .. } if owner == "a" && rejected == "c" ));
		assert_eq!( hook.unregister( "a" ), 1 );
		assert!( hook.register( recorder( "c" ).exclusive() ).is_ok() );
	}

}
