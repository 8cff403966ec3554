/// Owned, chainable push/extend for accumulators threaded through folds.
pub(crate) trait Merge<T> {
	fn merge( self, item: T ) -> Self ;
	fn merge_all( self, items: impl IntoIterator<Item = T> ) -> Self ;
}

impl<T> Merge<T> for Vec<T> {

	#[inline]
	fn merge( mut self, item: T ) -> Self {
		self.push( item );
		self
	}

	#[inline]
	fn merge_all( mut self, items: impl IntoIterator<Item = T> ) -> Self {
		self.extend( items );
		self
	}

}
