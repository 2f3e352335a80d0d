//! Lightweight GLSL declaration scanner.
//!
//! Finds global `in`/`out`/`uniform` declarations and uniform block names in
//! one stage's source. It is not a parser: it only understands the
//! declaration forms the renderer's shaders use, which is enough to emulate
//! driver reflection in [`DummyDevice`](crate::backend::DummyDevice) and to
//! enumerate fragment outputs on drivers without program-interface queries.

use crate::backend::{TextureTarget, UniformKind};

/// A single global variable declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub ty: String,
    pub name: String,
    /// Explicit `layout(location = N)`.
    pub location: Option<u32>,
}

impl Declaration {
    pub fn uniform_kind(&self) -> UniformKind {
        match sampler_target(&self.ty) {
            Some(target) => UniformKind::Sampler(target),
            None => UniformKind::Value,
        }
    }
}

/// Global declarations of one shader stage, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDeclarations {
    pub inputs: Vec<Declaration>,
    pub outputs: Vec<Declaration>,
    pub uniforms: Vec<Declaration>,
    pub uniform_blocks: Vec<String>,
}

const IGNORED_QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "invariant",
    "highp",
    "mediump",
    "lowp",
    "const",
];

/// Texture target sampled by a GLSL sampler type, `None` if `ty` is not an
/// opaque sampler type.
pub fn sampler_target(ty: &str) -> Option<TextureTarget> {
    let base = ty
        .strip_prefix('i')
        .or_else(|| ty.strip_prefix('u'))
        .unwrap_or(ty);
    let shape = base.strip_prefix("sampler")?;
    let target = if shape.starts_with("Cube") {
        TextureTarget::Cube
    } else if shape.starts_with("2DArray") || shape.starts_with("1DArray") {
        TextureTarget::Texture2DArray
    } else if shape.starts_with("3D") {
        TextureTarget::Texture3D
    } else if shape.starts_with("1D")
        || shape.starts_with("2D")
        || shape.starts_with("Buffer")
    {
        TextureTarget::Texture2D
    } else {
        return None;
    };
    Some(target)
}

/// Scan one stage's (already preprocessed) source.
pub fn scan_declarations(source: &str) -> StageDeclarations {
    let code = strip_comments_and_directives(source);
    let mut decls = StageDeclarations::default();

    let mut depth = 0usize;
    let mut statement = String::new();
    for ch in code.chars() {
        match ch {
            '{' => {
                if depth == 0 {
                    if let Some(block) = block_header(&statement) {
                        decls.uniform_blocks.push(block);
                    }
                    statement.clear();
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
            }
            ';' if depth == 0 => {
                parse_statement(&statement, &mut decls);
                statement.clear();
            }
            _ if depth == 0 => statement.push(ch),
            _ => {}
        }
    }

    decls
}

fn strip_comments_and_directives(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |i| &after[i..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]);
            out.push(' ');
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                out.push(ch);
            }
            rest = chars.as_str();
        }
    }

    out.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split off a leading `layout(...)` qualifier, returning its explicit
/// location and the remaining text.
fn take_layout(statement: &str) -> (Option<u32>, &str) {
    let trimmed = statement.trim_start();
    let Some(after) = trimmed.strip_prefix("layout") else {
        return (None, trimmed);
    };
    let after = after.trim_start();
    let Some(args) = after.strip_prefix('(') else {
        return (None, trimmed);
    };
    let Some(close) = args.find(')') else {
        return (None, trimmed);
    };

    let location = args[..close].split(',').find_map(|arg| {
        let (key, value) = arg.split_once('=')?;
        (key.trim() == "location")
            .then(|| value.trim().parse().ok())
            .flatten()
    });
    (location, &args[close + 1..])
}

fn qualified_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|tok| !IGNORED_QUALIFIERS.contains(tok))
        .collect()
}

fn block_header(statement: &str) -> Option<String> {
    let (_, rest) = take_layout(statement);
    match qualified_tokens(rest).as_slice() {
        ["uniform", name] => Some((*name).to_string()),
        _ => None,
    }
}

fn parse_statement(statement: &str, decls: &mut StageDeclarations) {
    let (location, rest) = take_layout(statement);
    let tokens = qualified_tokens(rest);
    let [storage, ty, declarators @ ..] = tokens.as_slice() else {
        return;
    };
    if declarators.is_empty() {
        return;
    }

    let list = match *storage {
        "in" | "attribute" => &mut decls.inputs,
        "out" => &mut decls.outputs,
        "uniform" => &mut decls.uniforms,
        _ => return,
    };

    let joined = declarators.join(" ");
    for (i, declarator) in joined.split(',').enumerate() {
        let name = declarator
            .split(['=', '['])
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() {
            continue;
        }
        list.push(Declaration {
            ty: (*ty).to_string(),
            name: name.to_string(),
            location: location.map(|loc| loc + i as u32),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"
#version 330 core
// outputs
layout(location = 0) out vec4 outAlbedo;
out vec4 outNormal;
in vec2 fragUV;
uniform sampler2D materialAlbedo;
uniform samplerCube frameEnvironment; /* env */
uniform float exposure;
layout(std140) uniform ubCommon {
    mat4 matProjection;
    mat4 matView;
};
void main() {
    outAlbedo = texture(materialAlbedo, fragUV);
}
"#;

    #[test]
    fn test_scan_fragment_declarations() {
        let decls = scan_declarations(FRAGMENT);

        let outputs: Vec<_> = decls.outputs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(outputs, ["outAlbedo", "outNormal"]);
        assert_eq!(decls.outputs[0].location, Some(0));
        assert_eq!(decls.outputs[1].location, None);

        let uniforms: Vec<_> = decls.uniforms.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(uniforms, ["materialAlbedo", "frameEnvironment", "exposure"]);
        assert_eq!(decls.uniform_blocks, ["ubCommon"]);
        assert_eq!(decls.inputs.len(), 1);
    }

    #[test]
    fn test_uniform_kinds() {
        let decls = scan_declarations(FRAGMENT);
        assert_eq!(
            decls.uniforms[0].uniform_kind(),
            UniformKind::Sampler(TextureTarget::Texture2D)
        );
        assert_eq!(
            decls.uniforms[1].uniform_kind(),
            UniformKind::Sampler(TextureTarget::Cube)
        );
        assert_eq!(decls.uniforms[2].uniform_kind(), UniformKind::Value);
    }

    #[test]
    fn test_sampler_target() {
        assert_eq!(sampler_target("sampler2D"), Some(TextureTarget::Texture2D));
        assert_eq!(sampler_target("usampler2D"), Some(TextureTarget::Texture2D));
        assert_eq!(sampler_target("isamplerCube"), Some(TextureTarget::Cube));
        assert_eq!(
            sampler_target("sampler2DArrayShadow"),
            Some(TextureTarget::Texture2DArray)
        );
        assert_eq!(sampler_target("vec4"), None);
        assert_eq!(sampler_target("int"), None);
    }

    #[test]
    fn test_multiple_declarators_and_arrays() {
        let decls = scan_declarations("layout(location = 2) in vec3 inA, inB;\nuniform mat4 bones[64];");
        let names: Vec<_> = decls.inputs.iter().map(|d| (d.name.as_str(), d.location)).collect();
        assert_eq!(names, [("inA", Some(2)), ("inB", Some(3))]);
        assert_eq!(decls.uniforms[0].name, "bones");
    }

    #[test]
    fn test_function_bodies_ignored() {
        let decls = scan_declarations("vec3 f() { vec3 out_ = vec3(0); return out_; }\nout vec4 outFinal;");
        assert_eq!(decls.outputs.len(), 1);
        assert_eq!(decls.outputs[0].name, "outFinal");
    }
}
