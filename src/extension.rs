//! Constructed extensions and calls into them.

use std::collections::HashMap ;
use thiserror::Error ;
use wasmtime::component::{ Instance, Val };

use crate::isolation::{ ContextHandle, IsolationUnit, PluginContext };



/// Errors that can occur when calling into an extension.
#[derive( Error, Debug )]
pub enum DispatchError {
	/// Failed to acquire the lock on the isolation unit (a previous call panicked).
	#[error( "Lock Rejected" )] LockRejected,
	/// The function is not exported by the extension interface.
	#[error( "Invalid Function: {0}" )] InvalidFunction( String ),
	/// The WASM function threw an exception during execution.
	#[error( "Runtime Exception: {0}" )] RuntimeException( wasmtime::Error ),
	/// A method call was made on an extension whose constructor returned nothing.
	#[error( "Extension has no state to pass to {0}" )] MissingState( String ),
}

impl From<DispatchError> for Val {
	fn from( error: DispatchError ) -> Val { match error {
		DispatchError::LockRejected => Val::Variant( "lock-rejected".to_string(), None ),
		DispatchError::InvalidFunction( function ) => Val::Variant( "invalid-function".to_string(), Some( Box::new( Val::String( function )))),
		DispatchError::RuntimeException( exception ) => Val::Variant( "runtime-exception".to_string(), Some( Box::new( Val::String( exception.to_string() )))),
		DispatchError::MissingState( function ) => Val::Variant( "missing-state".to_string(), Some( Box::new( Val::String( function )))),
	}}
}

/// A plugin's extension: the exported contract interface, constructed and ready for calls.
///
/// The values returned by the constructor are kept as the extension's state. For a
/// constructor returning a resource this is the resource handle, which
/// [`call_method`]( Self::call_method ) passes as the first argument of every call.
///
/// The extension keeps its isolation unit alive. Dropping it, or calling
/// [`close`]( Self::close ), releases the unit once no other extension of the same package
/// uses it.
pub struct ExtensionInstance<Ctx: 'static> {
	unit: ContextHandle<Ctx>,
	instance: Instance,
	export: String,
	constructor: String,
	state: Vec<Val>,
	result_counts: HashMap<String, usize>,
}

impl<Ctx: 'static> std::fmt::Debug for ExtensionInstance<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::result::Result<(), std::fmt::Error> {
		f.debug_struct( "ExtensionInstance" )
			.field( "package", &self.unit.package() )
			.field( "export", &self.export )
			.field( "constructor", &self.constructor )
			.field( "state", &self.state )
			.finish_non_exhaustive()
	}
}

impl<Ctx: PluginContext> ExtensionInstance<Ctx> {

	const PLACEHOLDER_VAL: Val = Val::Tuple( vec![] );

	pub(crate) fn new(
		unit: ContextHandle<Ctx>,
		instance: Instance,
		export: String,
		result_counts: HashMap<String, usize>,
	) -> Self {
		Self { unit, instance, export, constructor: String::new(), state: Vec::with_capacity( 0 ), result_counts }
	}

	/// Runs `constructor` and keeps what it returns as the extension state.
	pub(crate) fn construct( mut self, constructor: &str, args: &[Val] ) -> Result<Self, DispatchError> {
		self.state = self.call( constructor, args )?;
		self.constructor = constructor.to_string();
		Ok( self )
	}

	/// Name of the exported interface instance, e.g. `acme:demo/extension@1.0.0`.
	#[inline] pub fn export( &self ) -> &str { &self.export }
	/// Constructor that produced the state; empty when none was called.
	#[inline] pub fn constructor( &self ) -> &str { &self.constructor }
	#[inline] pub fn state( &self ) -> &[Val] { &self.state }
	#[inline] pub fn unit( &self ) -> &ContextHandle<Ctx> { &self.unit }

	/// Names of every function the extension interface exports.
	pub fn functions( &self ) -> impl Iterator<Item = &str> { self.result_counts.keys().map( String::as_str )}

	/// Calls `function` of the extension interface.
	///
	/// # Errors
	/// Fails if the function does not exist, the unit is poisoned or the call traps.
	pub fn call( &self, function: &str, args: &[Val] ) -> Result<Vec<Val>, DispatchError> {

		let invalid = || DispatchError::InvalidFunction( format!( "{}#{}", self.export, function ));
		let result_count = *self.result_counts.get( function ).ok_or_else( invalid )?;

		self.unit.with_store(| store | {

			let export_index = self.instance
				.get_export_index( &mut *store, None, &self.export )
				.ok_or_else( invalid )?;
			let func_index = self.instance
				.get_export_index( &mut *store, Some( &export_index ), function )
				.ok_or_else( invalid )?;
			let func = self.instance
				.get_func( &mut *store, func_index )
				.ok_or_else( invalid )?;

			let mut buffer = vec![ Self::PLACEHOLDER_VAL ; result_count ];
			func.call( &mut *store, args, &mut buffer ).map_err( DispatchError::RuntimeException )?;
			let _ = func.post_return( &mut *store );
			Ok( buffer )

		})?

	}

	/// Calls `function` with the extension state prepended to `args`.
	///
	/// # Errors
	/// Returns [`DispatchError::MissingState`] if the constructor returned nothing, otherwise
	/// fails like [`call`]( Self::call ).
	pub fn call_method( &self, function: &str, args: &[Val] ) -> Result<Vec<Val>, DispatchError> {
		if self.state.is_empty() { return Err( DispatchError::MissingState( function.to_string() )) }
		let full_args = self.state.iter().chain( args ).cloned().collect::<Vec<_>>();
		self.call( function, &full_args )
	}

	/// Releases this extension's hold on its isolation unit.
	///
	/// Returns whether the unit was torn down as a result.
	pub fn close( self ) -> bool { IsolationUnit::close( self.unit ) }

}
