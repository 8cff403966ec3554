#[allow( unused_macros )]
macro_rules! assert_no_warnings {
	( $warnings:expr ) => {
		if !$warnings.is_empty() { panic!( "Produced warnings: {:?}", $warnings ) }
	};
}

#[allow( unused_macros )]
macro_rules! assert_clean {
	( $report:expr ) => {{
		let report = &$report ;
		if !report.is_clean() {
			panic!(
				"Loading was not clean\n  failed: {:#?}\n  unresolvable: {:#?}\n  rejected: {:#?}",
				report.failed, report.unresolvable, report.rejected,
			)
		}
	}};
}
