//! The assembler marker behavior.

use std::any::Any;

use serde::{Deserialize, Serialize};

use stage_core::TemplateId;
use stage_scene::{AssemblyHooks, Behavior, HookContext, HookResult, NodeId, SceneGraph};

/// Marks a scene node as the source of a template. Assembling the marker
/// writes the node's subtree into the target template asset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Assembler {
    /// Target template, unset until the user assigns one
    pub target: Option<TemplateId>,
    /// Batch ordering priority, lowest runs first
    #[serde(default)]
    pub priority: i32,
}

impl Assembler {
    pub const TYPE_NAME: &'static str = "assembler";

    pub fn with_target(target: TemplateId) -> Self {
        Self {
            target: Some(target),
            priority: 0,
        }
    }
}

impl Behavior for Assembler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_box(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn assembly(&mut self) -> Option<&mut dyn AssemblyHooks> {
        Some(self)
    }
}

impl AssemblyHooks for Assembler {
    /// The clone sheds its marker here, so the written template never
    /// carries one.
    fn on_assemble(&mut self, ctx: &mut HookContext) -> HookResult {
        ctx.remove_self();
        Ok(())
    }
}

/// Find the assembler on the first node with the given name.
pub fn find_in_scene<'a>(graph: &'a SceneGraph, name: &str) -> Option<(NodeId, &'a Assembler)> {
    let id = graph.find_by_name(name)?;
    graph.get(id)?.behavior::<Assembler>().map(|a| (id, a))
}
