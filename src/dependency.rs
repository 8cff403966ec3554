//! Ordering packages so that every package loads after its dependencies.
//!
//! A [`DependencyResolver`] splits a set of manifests into [`LoadStep`]s: groups of manifests
//! that only depend on manifests of earlier steps (or on manifests resolved beforehand), and
//! may therefore be loaded together. Manifests that cannot be placed are reported with an
//! [`UnresolvableReason`].
//!
//! Resolution is pure: it performs no I/O and the same input always yields the same result.
//!
//! # Example
//!
//! ```
//! use wasm_plugin_loader::{ Manifest, Dependency, DependencyResolver, TopologicalResolver, parse_version };
//!
//! let core = Manifest::new( "core", parse_version( "1.0" ).unwrap() );
//! let fixes = Manifest::new( "fixes", parse_version( "0.3" ).unwrap() )
//! 	.with_dependency( Dependency::required( "core" ));
//!
//! let result = TopologicalResolver.resolve_dependencies( &[ fixes, core ], &[] );
//! assert!( result.is_fully_resolved() );
//! assert_eq!( result.step_of( "core" ), Some( 0 ));
//! assert_eq!( result.step_of( "fixes" ), Some( 1 ));
//! ```

mod topological ;
mod multi_phase ;

pub use topological::TopologicalResolver ;
pub use multi_phase::MultiPhaseResolver ;

use std::collections::{ BTreeMap, BTreeSet };
use itertools::Itertools ;

use crate::manifest::{ Dependency, Manifest };



/// A non-empty group of manifests whose dependencies are all met by earlier steps.
///
/// Members of one step do not depend on each other and may be loaded in any order.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct LoadStep( BTreeSet<Manifest> );

impl LoadStep {

	/// # Panics
	/// Panics if `manifests` is empty.
	pub(crate) fn new( manifests: BTreeSet<Manifest> ) -> Self {
		assert!( !manifests.is_empty(), "A load step must contain at least one manifest" );
		Self( manifests )
	}

	#[inline] pub fn manifests( &self ) -> &BTreeSet<Manifest> { &self.0 }
	#[inline] pub fn len( &self ) -> usize { self.0.len() }
	#[inline] pub fn iter( &self ) -> impl Iterator<Item = &Manifest> { self.0.iter() }

	pub fn contains( &self, unique_name: &str ) -> bool {
		self.0.iter().any(| manifest | manifest.unique_name() == unique_name )
	}

	pub fn into_manifests( self ) -> BTreeSet<Manifest> { self.0 }

}

impl<'a> IntoIterator for &'a LoadStep {
	type Item = &'a Manifest ;
	type IntoIter = std::collections::btree_set::Iter<'a, Manifest> ;
	fn into_iter( self ) -> Self::IntoIter { self.0.iter() }
}

/// Why a manifest could not be placed in any load step.
#[derive( Clone, Debug, PartialEq, Eq )]
pub enum UnresolvableReason {
	/// These required dependencies match no manifest that could be loaded.
	MissingDependencies( BTreeSet<Dependency> ),
	/// The manifest is part of a cycle of required dependencies, listed in traversal order.
	DependencyCycle( Vec<Manifest> ),
	/// Nothing more specific could be determined.
	Unknown,
}

impl std::fmt::Display for UnresolvableReason {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { match self {
		Self::MissingDependencies( dependencies ) => write!( f, "Missing dependencies: {}", dependencies.iter().join( ", " )),
		Self::DependencyCycle( cycle ) => match cycle.first() {
			Some( first ) => write!( f, "Dependency cycle: {} -> {}", cycle.iter().join( " -> " ), first ),
			Option::None => write!( f, "Dependency cycle" ),
		},
		Self::Unknown => write!( f, "Unresolvable for an unknown reason" ),
	}}
}

/// Outcome of [`DependencyResolver::resolve_dependencies`].
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct ResolveResult {
	pub load_steps: Vec<LoadStep>,
	pub unresolvable: BTreeMap<Manifest, UnresolvableReason>,
}

impl ResolveResult {

	#[inline] pub fn is_fully_resolved( &self ) -> bool { self.unresolvable.is_empty() }

	/// Every placed manifest, step by step.
	pub fn resolved( &self ) -> impl Iterator<Item = &Manifest> {
		self.load_steps.iter().flat_map( LoadStep::iter )
	}

	/// Index of the step containing the manifest called `unique_name`.
	pub fn step_of( &self, unique_name: &str ) -> Option<usize> {
		self.load_steps.iter().position(| step | step.contains( unique_name ))
	}

	/// Reason the manifest called `unique_name` was not placed.
	pub fn reason_for( &self, unique_name: &str ) -> Option<&UnresolvableReason> {
		self.unresolvable.iter()
			.find(| ( manifest, _ ) | manifest.unique_name() == unique_name )
			.map(| ( _, reason ) | reason )
	}

}

/// Computes load steps for a set of manifests.
pub trait DependencyResolver {
	/// Places every manifest of `to_resolve` in a load step, or explains why it could not.
	///
	/// Manifests in `already_resolved` count as loaded and satisfy dependencies without
	/// appearing in the result.
	fn resolve_dependencies( &self, to_resolve: &[Manifest], already_resolved: &[Manifest] ) -> ResolveResult ;
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for &R {
	fn resolve_dependencies( &self, to_resolve: &[Manifest], already_resolved: &[Manifest] ) -> ResolveResult {
		( **self ).resolve_dependencies( to_resolve, already_resolved )
	}
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for Box<R> {
	fn resolve_dependencies( &self, to_resolve: &[Manifest], already_resolved: &[Manifest] ) -> ResolveResult {
		( **self ).resolve_dependencies( to_resolve, already_resolved )
	}
}
