use std::fmt::Debug ;

use crate::manifest::{ LoadPhase, Manifest };
use super::{ DependencyResolver, ResolveResult, UnresolvableReason };



/// Resolves manifests phase by phase.
///
/// Manifests are partitioned by a classifier and each phase is resolved separately, in the
/// order of the phase list, with everything placed in earlier phases counting as already
/// resolved. A manifest can thus depend on earlier phases but never on later ones: such a
/// dependency shows up as missing. Manifests whose phase is not listed are
/// [`Unknown`]( UnresolvableReason::Unknown ).
pub struct MultiPhaseResolver<R, F, Ph> {
	inner: R,
	classify: F,
	phases: Vec<Ph>,
}

impl<R, F, Ph> MultiPhaseResolver<R, F, Ph>
where
	R: DependencyResolver,
	F: Fn( &Manifest ) -> Ph,
	Ph: PartialEq + Debug,
{
	pub fn new( inner: R, classify: F, phases: impl IntoIterator<Item = Ph> ) -> Self {
		Self { inner, classify, phases: phases.into_iter().collect() }
	}

	#[inline] pub fn phases( &self ) -> &[Ph] { &self.phases }
}

impl<R: DependencyResolver> MultiPhaseResolver<R, fn( &Manifest ) -> LoadPhase, LoadPhase> {
	/// Phases taken from [`Manifest::load_phase`], in [`LoadPhase::ALL`] order.
	pub fn by_load_phase( inner: R ) -> Self {
		Self::new( inner, Manifest::load_phase, LoadPhase::ALL )
	}
}

impl<R, F, Ph> DependencyResolver for MultiPhaseResolver<R, F, Ph>
where
	R: DependencyResolver,
	F: Fn( &Manifest ) -> Ph,
	Ph: PartialEq + Debug,
{
	fn resolve_dependencies( &self, to_resolve: &[Manifest], already_resolved: &[Manifest] ) -> ResolveResult {

		let classified = to_resolve.iter()
			.map(| manifest | (( self.classify )( manifest ), manifest ))
			.collect::<Vec<_>>();

		let mut available = already_resolved.to_vec();
		let mut result = ResolveResult::default();

		for phase in &self.phases {

			let batch = classified.iter()
				.filter(| ( manifest_phase, _ ) | manifest_phase == phase )
				.map(| ( _, manifest ) | ( *manifest ).clone() )
				.collect::<Vec<_>>();
			if batch.is_empty() { continue }

			tracing::debug!( ?phase, count = batch.len(), "Resolving load phase" );
			let phase_result = self.inner.resolve_dependencies( &batch, &available );
			available.extend( phase_result.resolved().cloned() );
			result.load_steps.extend( phase_result.load_steps );
			result.unresolvable.extend( phase_result.unresolvable );

		}

		classified.into_iter()
			.filter(| ( phase, _ ) | !self.phases.contains( phase ))
			.for_each(| ( phase, manifest ) | {
				tracing::warn!( package = %manifest, ?phase, "Manifest belongs to no configured load phase" );
				result.unresolvable.insert( manifest.clone(), UnresolvableReason::Unknown );
			});

		result

	}
}
