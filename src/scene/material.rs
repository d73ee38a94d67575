//! Materials and their shader node graphs.
//!
//! Only the subset of a node graph the converter cares about is modelled:
//! a principled BSDF with constant base color / alpha inputs, image texture
//! nodes that can drive those inputs, and the material output.

use serde::{Deserialize, Serialize};

use super::ImageId;

/// Name of the principled node created for every node-based material.
pub const PRINCIPLED_NODE_NAME: &str = "Principled BSDF";

/// How the material's alpha is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Blend,
}

/// Input sockets of the principled node that links may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipledSocket {
    BaseColor,
    Alpha,
}

/// Output sockets a link may read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSocket {
    Color,
    Alpha,
    Bsdf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipledBsdf {
    /// Constant RGBA used when `BaseColor` is not linked.
    pub base_color: [f32; 4],
    /// Constant alpha used when `Alpha` is not linked.
    pub alpha: f32,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for PrincipledBsdf {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.8, 0.8, 1.0],
            alpha: 1.0,
            metallic: 0.0,
            roughness: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShaderNodeKind {
    Principled(PrincipledBsdf),
    ImageTexture { image: ImageId },
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderNode {
    pub name: String,
    pub kind: ShaderNodeKind,
}

/// Directed link `from_node.from_socket -> to_node.to_socket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLink {
    pub from_node: usize,
    pub from_socket: OutputSocket,
    pub to_node: usize,
    /// `None` for links into non-principled nodes (e.g. BSDF -> output).
    pub to_socket: Option<PrincipledSocket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    pub nodes: Vec<ShaderNode>,
    pub links: Vec<NodeLink>,
}

impl NodeTree {
    /// A principled BSDF wired into a material output.
    pub fn principled(bsdf: PrincipledBsdf) -> Self {
        Self {
            nodes: vec![
                ShaderNode {
                    name: PRINCIPLED_NODE_NAME.to_string(),
                    kind: ShaderNodeKind::Principled(bsdf),
                },
                ShaderNode {
                    name: "Material Output".to_string(),
                    kind: ShaderNodeKind::Output,
                },
            ],
            links: vec![NodeLink {
                from_node: 0,
                from_socket: OutputSocket::Bsdf,
                to_node: 1,
                to_socket: None,
            }],
        }
    }

    pub fn principled_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| matches!(n.kind, ShaderNodeKind::Principled(_)))
    }

    pub fn principled_node(&self) -> Option<&PrincipledBsdf> {
        self.nodes.iter().find_map(|n| match &n.kind {
            ShaderNodeKind::Principled(bsdf) => Some(bsdf),
            _ => None,
        })
    }

    pub fn principled_node_mut(&mut self) -> Option<&mut PrincipledBsdf> {
        self.nodes.iter_mut().find_map(|n| match &mut n.kind {
            ShaderNodeKind::Principled(bsdf) => Some(bsdf),
            _ => None,
        })
    }

    pub fn add_node(&mut self, name: &str, kind: ShaderNodeKind) -> usize {
        self.nodes.push(ShaderNode {
            name: name.to_string(),
            kind,
        });
        self.nodes.len() - 1
    }

    /// Connect an image texture output to a principled input.
    pub fn link_image(&mut self, image_node: usize, from: OutputSocket, to: PrincipledSocket) {
        if let Some(bsdf) = self.principled_index() {
            self.links.push(NodeLink {
                from_node: image_node,
                from_socket: from,
                to_node: bsdf,
                to_socket: Some(to),
            });
        }
    }

    pub fn links_into(&self, node: usize) -> impl Iterator<Item = &NodeLink> {
        self.links.iter().filter(move |l| l.to_node == node)
    }

    /// Remove every link targeting `node`; returns how many were removed.
    pub fn unlink_inputs(&mut self, node: usize) -> usize {
        let before = self.links.len();
        self.links.retain(|l| l.to_node != node);
        before - self.links.len()
    }

    /// Image driving the given principled socket, if any.
    pub fn linked_image(&self, socket: PrincipledSocket) -> Option<(ImageId, OutputSocket)> {
        let bsdf = self.principled_index()?;
        self.links_into(bsdf)
            .filter(|l| l.to_socket == Some(socket))
            .find_map(|l| match self.nodes.get(l.from_node).map(|n| &n.kind) {
                Some(ShaderNodeKind::ImageTexture { image }) => Some((*image, l.from_socket)),
                _ => None,
            })
    }

    pub fn is_linked(&self, socket: PrincipledSocket) -> bool {
        match self.principled_index() {
            Some(bsdf) => self.links_into(bsdf).any(|l| l.to_socket == Some(socket)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub blend_method: BlendMethod,
    /// `None` for materials that do not use nodes.
    pub node_tree: Option<NodeTree>,
}

impl Material {
    /// A node-based material with a default principled BSDF.
    pub fn new(name: &str) -> Self {
        Self::with_bsdf(name, PrincipledBsdf::default())
    }

    pub fn with_bsdf(name: &str, bsdf: PrincipledBsdf) -> Self {
        Self {
            name: name.to_string(),
            blend_method: BlendMethod::Opaque,
            node_tree: Some(NodeTree::principled(bsdf)),
        }
    }

    pub fn principled(&self) -> Option<&PrincipledBsdf> {
        self.node_tree.as_ref().and_then(|t| t.principled_node())
    }

    /// Number of links feeding the principled node.
    pub fn principled_input_links(&self) -> usize {
        match &self.node_tree {
            Some(tree) => tree
                .principled_index()
                .map_or(0, |idx| tree.links_into(idx).count()),
            None => 0,
        }
    }

    /// Fully transparent: both constant alphas are zero.
    pub fn is_fully_transparent(&self) -> bool {
        self.principled()
            .map_or(false, |b| b.alpha == 0.0 && b.base_color[3] == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(alpha_linked: bool) -> Material {
        let mut mat = Material::new("wall");
        let tree = mat.node_tree.as_mut().unwrap();
        let tex = tree.add_node("Image Texture", ShaderNodeKind::ImageTexture { image: ImageId(0) });
        tree.link_image(tex, OutputSocket::Color, PrincipledSocket::BaseColor);
        if alpha_linked {
            tree.link_image(tex, OutputSocket::Alpha, PrincipledSocket::Alpha);
        }
        mat
    }

    #[test]
    fn new_material_has_principled_node() {
        let mat = Material::new("m");
        assert!(mat.principled().is_some());
        assert_eq!(mat.principled_input_links(), 0);
    }

    #[test]
    fn linked_image_reports_socket() {
        let mat = textured(true);
        let tree = mat.node_tree.as_ref().unwrap();
        assert_eq!(
            tree.linked_image(PrincipledSocket::BaseColor),
            Some((ImageId(0), OutputSocket::Color))
        );
        assert_eq!(
            tree.linked_image(PrincipledSocket::Alpha),
            Some((ImageId(0), OutputSocket::Alpha))
        );
        assert_eq!(mat.principled_input_links(), 2);
    }

    #[test]
    fn unlink_inputs_keeps_output_link() {
        let mut mat = textured(true);
        let tree = mat.node_tree.as_mut().unwrap();
        let bsdf = tree.principled_index().unwrap();
        assert_eq!(tree.unlink_inputs(bsdf), 2);
        assert!(!tree.is_linked(PrincipledSocket::BaseColor));
        // BSDF -> output link survives
        assert_eq!(tree.links.len(), 1);
    }

    #[test]
    fn material_without_nodes_has_no_principled() {
        let mat = Material {
            name: "legacy".into(),
            blend_method: BlendMethod::Opaque,
            node_tree: None,
        };
        assert!(mat.principled().is_none());
        assert!(!mat.is_fully_transparent());
    }
}
