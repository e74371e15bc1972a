/// Static table of standard atomic weights, embedded as a text resource and
/// parsed once on first access.
pub mod periodic_table;
/// Chemical formula parsing into elemental compositions and formula weights.
///
///  # Examples
/// ```
/// use WeiCalc::Stoichiometry::composition::Composition;
/// let comp = Composition::from_formula("Li2O").unwrap();
/// println!("Element counts: {:?}", comp.elements());
/// println!("Formula weight: {:?} g/mol", comp.weight());
/// ```
pub mod composition;
/// Decomposition of a target product composition into a non-negative linear
/// combination of material compositions (non-negative least squares over the
/// element-count matrix), in exact and tolerant modes.
///
///  # Examples
/// ```
/// use WeiCalc::Stoichiometry::composition::Composition;
/// use WeiCalc::Stoichiometry::ratio_resolver::resolve_ratios;
/// let materials = vec![
///     Composition::from_formula("Li2O").unwrap(),
///     Composition::from_formula("SiO2").unwrap(),
/// ];
/// let products = vec![Composition::from_formula("Li2SiO3").unwrap()];
/// let table = resolve_ratios(&materials, &products, true);
/// println!("{:?}", table.rows[0]);
/// ```
pub mod ratio_resolver;
