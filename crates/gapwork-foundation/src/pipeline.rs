//! The parse, bind and layout collaborators a row goes through.

use gapwork_core::{TaskError, TemplateKey};

use crate::constraints::Constraints;

/// Turns a list position into a laid-out row.
///
/// Implementations wrap the template parser, the data binder and the layout
/// engine. They run from prefetch tasks during idle frame time and from
/// [`ListPrefetcher::take_row`](crate::ListPrefetcher::take_row) on a cache
/// miss, so each step must be safe to repeat.
pub trait RowPipeline: 'static {
    /// Component tree produced by parsing and updated by binding.
    type Tree: 'static;
    /// Layout result.
    type Geometry: 'static;

    /// Template used for `position`, or `None` if the data set has no such item.
    fn template_for(&self, position: usize) -> Option<TemplateKey>;

    fn parse(&self, template: &TemplateKey) -> Result<Self::Tree, TaskError>;

    fn bind(&self, tree: Self::Tree, position: usize) -> Result<Self::Tree, TaskError>;

    fn layout(
        &self,
        tree: &Self::Tree,
        constraints: &Constraints,
    ) -> Result<Self::Geometry, TaskError>;
}

/// A row that went through the whole pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRow<T, G> {
    pub position: usize,
    pub template: TemplateKey,
    pub tree: T,
    pub geometry: G,
}

/// Parses, binds and lays out `position` with a known template.
pub fn prepare_row<P: RowPipeline + ?Sized>(
    pipeline: &P,
    template: TemplateKey,
    position: usize,
    constraints: &Constraints,
) -> Result<PreparedRow<P::Tree, P::Geometry>, TaskError> {
    let tree = pipeline.parse(&template)?;
    let tree = pipeline.bind(tree, position)?;
    let geometry = pipeline.layout(&tree, constraints)?;
    Ok(PreparedRow {
        position,
        template,
        tree,
        geometry,
    })
}

/// Resolves the template of `position` and runs the pipeline.
pub fn build_row<P: RowPipeline + ?Sized>(
    pipeline: &P,
    position: usize,
    constraints: &Constraints,
) -> Result<PreparedRow<P::Tree, P::Geometry>, TaskError> {
    let template = pipeline
        .template_for(position)
        .ok_or(TaskError::MissingData { position })?;
    prepare_row(pipeline, template, position, constraints)
}
