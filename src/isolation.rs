//! Per-package isolation units.
//!
//! Every package gets its own [`IsolationUnit`]: a wasmtime [`Store`] holding the package's
//! context, in which all of its components are instantiated. Units never share state, so
//! nothing one package instantiates is visible to another.
//!
//! Units are handed out as reference counted [`ContextHandle`]s. The [`ContextProvider`] only
//! keeps weak references, so a unit lives exactly as long as something that was loaded in it
//! and is torn down as soon as the last handle is closed or dropped.

use std::collections::HashMap ;
use std::sync::{ Arc, Mutex, PoisonError, Weak };
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Component, Instance, Linker, ResourceTable };

use crate::extension::DispatchError ;
use crate::manifest::Manifest ;
use crate::package::PackageId ;



/// Data stored in the [`Store`] of an isolation unit.
///
/// # Example
///
/// ```
/// use wasm_plugin_loader::{ Manifest, PluginContext, ResourceTable };
///
/// struct HostState { owner: String, resource_table: ResourceTable }
///
/// impl PluginContext for HostState {
/// 	fn for_package( manifest: &Manifest ) -> Self {
/// 		Self { owner: manifest.unique_name().to_string(), resource_table: ResourceTable::new() }
/// 	}
/// }
/// ```
pub trait PluginContext: Send + 'static {
	/// Creates the context of a fresh unit for the package described by `manifest`.
	fn for_package( manifest: &Manifest ) -> Self ;
}

/// Context used when the host has no state of its own to expose.
#[derive( Debug )]
pub struct DefaultContext {
	unique_name: String,
	resource_table: ResourceTable,
}

impl DefaultContext {
	#[inline] pub fn unique_name( &self ) -> &str { &self.unique_name }
	#[inline] pub fn resource_table( &mut self ) -> &mut ResourceTable { &mut self.resource_table }
}

impl PluginContext for DefaultContext {
	fn for_package( manifest: &Manifest ) -> Self {
		Self { unique_name: manifest.unique_name().to_string(), resource_table: ResourceTable::new() }
	}
}

/// The store a single package is instantiated in.
pub struct IsolationUnit<Ctx: 'static> {
	package: PackageId,
	store: Mutex<Store<Ctx>>,
}

/// Shared ownership of an [`IsolationUnit`].
pub type ContextHandle<Ctx> = Arc<IsolationUnit<Ctx>> ;

impl<Ctx: 'static> IsolationUnit<Ctx> {
	/// The package this unit belongs to.
	#[inline] pub fn package( &self ) -> PackageId { self.package }
}

impl<Ctx: PluginContext> IsolationUnit<Ctx> {

	fn new( engine: &Engine, package: PackageId, manifest: &Manifest ) -> Self {
		Self { package, store: Mutex::new( Store::new( engine, Ctx::for_package( manifest )))}
	}

	/// Instantiates `component` inside this unit.
	///
	/// # Errors
	/// Fails if linking or instantiation fails.
	pub fn instantiate( &self, linker: &Linker<Ctx>, component: &Component ) -> Result<Instance, wasmtime::Error> {
		let mut store = self.store.lock().unwrap_or_else( PoisonError::into_inner );
		linker.instantiate( &mut *store, component )
	}

	/// Runs `f` with exclusive access to the unit's store.
	///
	/// # Errors
	/// Returns [`DispatchError::LockRejected`] if a previous user of the store panicked.
	pub fn with_store<T>( &self, f: impl FnOnce( &mut Store<Ctx> ) -> T ) -> Result<T, DispatchError> {
		let mut store = self.store.lock().map_err(|_| DispatchError::LockRejected )?;
		Ok( f( &mut store ))
	}

	/// Gives up `handle`, tearing the unit down if it was the last one.
	///
	/// Returns whether the store was dropped.
	pub fn close( handle: ContextHandle<Ctx> ) -> bool {
		let package = handle.package ;
		match Arc::into_inner( handle ) {
			Some( unit ) => {
				drop( unit );
				tracing::debug!( %package, "Isolation unit torn down" );
				true
			},
			Option::None => false,
		}
	}

}

impl<Ctx: 'static> std::fmt::Debug for IsolationUnit<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolationUnit" )
			.field( "package", &self.package )
			.finish_non_exhaustive()
	}
}

/// Hands out one isolation unit per package.
///
/// Asking twice for the same package returns the same unit while it is alive; once every
/// handle is gone the next request creates a fresh one. Views of one package obtained with
/// [`PluginPackage::narrow`]( crate::PluginPackage::narrow ) share its identity and
/// therefore its unit.
pub struct ContextProvider<Ctx: 'static> {
	engine: Engine,
	units: Mutex<HashMap<PackageId, Weak<IsolationUnit<Ctx>>>>,
}

impl<Ctx: PluginContext> ContextProvider<Ctx> {

	pub fn new( engine: Engine ) -> Self {
		Self { engine, units: Mutex::new( HashMap::new() )}
	}

	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// The live unit of package `id`, or a new one created for it.
	pub fn get_context( &self, id: PackageId, manifest: &Manifest ) -> ContextHandle<Ctx> {
		let mut units = self.units.lock().unwrap_or_else( PoisonError::into_inner );
		if let Some( unit ) = units.get( &id ).and_then( Weak::upgrade ) { return unit }
		let unit = Arc::new( IsolationUnit::new( &self.engine, id, manifest ));
		units.retain(| _, unit | unit.strong_count() > 0 );
		units.insert( id, Arc::downgrade( &unit ));
		tracing::trace!( package = %id, name = manifest.unique_name(), "Created isolation unit" );
		unit
	}

	/// Number of units that are still alive.
	pub fn live_units( &self ) -> usize {
		self.units.lock().unwrap_or_else( PoisonError::into_inner )
			.values()
			.filter(| unit | unit.strong_count() > 0 )
			.count()
	}

	/// Forgets units that have been torn down and returns how many there were.
	pub fn purge( &self ) -> usize {
		let mut units = self.units.lock().unwrap_or_else( PoisonError::into_inner );
		let before = units.len();
		units.retain(| _, unit | unit.strong_count() > 0 );
		before - units.len()
	}

}

#[cfg( test )]
mod tests {

	use super::* ;
	use crate::manifest::parse_version ;

	fn manifest( name: &str ) -> Manifest { Manifest::new( name, parse_version( "1.0" ).unwrap() )}

	fn ids() -> ( PackageId, PackageId ) {
		use crate::package::{ DirectoryStorage, PluginPackage };
		let storage = Arc::new( DirectoryStorage::new( "." ));
		( PluginPackage::new( (), storage.clone() ).id(), PluginPackage::new( (), storage ).id() )
	}

	#[test]
	fn same_package_shares_a_unit_until_closed() {
		let provider = ContextProvider::<DefaultContext>::new( Engine::default() );
		let ( first, _ ) = ids();
		let a = provider.get_context( first, &manifest( "a" ));
		let b = provider.get_context( first, &manifest( "a" ));
		assert!( Arc::ptr_eq( &a, &b ));
		assert!( !IsolationUnit::close( a ));
		assert!( IsolationUnit::close( b ));
		assert_eq!( provider.live_units(), 0 );
		assert_eq!( provider.purge(), 1 );
	}

	#[test]
	fn packages_never_share_units() {
		let provider = ContextProvider::<DefaultContext>::new( Engine::default() );
		let ( first, second ) = ids();
		let a = provider.get_context( first, &manifest( "same" ));
		let b = provider.get_context( second, &manifest( "same" ));
		assert!( !Arc::ptr_eq( &a, &b ));
		assert_eq!( provider.live_units(), 2 );
	}

	#[test]
	fn creating_a_unit_forgets_torn_down_ones() {
		let provider = ContextProvider::<DefaultContext>::new( Engine::default() );
		let ( first, second ) = ids();
		assert!( IsolationUnit::close( provider.get_context( first, &manifest( "a" ))));
		let _b = provider.get_context( second, &manifest( "b" ));
		assert_eq!( provider.units.lock().unwrap().len(), 1 );
		assert_eq!( provider.purge(), 0 );
	}

}
