//! Stage section splitting.
//!
//! A program source file holds one section per stage. A section opens with a
//! line whose first token is a stage marker (`#vertex`, `#fragment`) and runs
//! to the next marker line or the end of the file. Text before the first
//! marker belongs to no stage and is dropped.

use crate::backend::ShaderStage;

/// One stage's slice of a program source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSection<'a> {
    pub stage: ShaderStage,
    pub source: &'a str,
    /// 1-based line number of the first body line.
    pub first_line: usize,
}

/// Split `source` into stage sections, in file order.
pub fn split_sections(source: &str) -> Vec<ShaderSection<'_>> {
    let mut sections = Vec::new();
    let mut open: Option<(ShaderStage, usize, usize)> = None;
    let mut offset = 0;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        let marker = line
            .split_whitespace()
            .next()
            .and_then(ShaderStage::from_marker);

        if let Some(stage) = marker {
            if let Some((prev, start, first_line)) = open.take() {
                sections.push(ShaderSection {
                    stage: prev,
                    source: &source[start..offset],
                    first_line,
                });
            }
            open = Some((stage, offset + line.len(), index + 2));
        }
        offset += line.len();
    }

    if let Some((stage, start, first_line)) = open {
        sections.push(ShaderSection {
            stage,
            source: &source[start..],
            first_line,
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_sections() {
        let src = "// header\n#vertex\nvoid main() {}\n#fragment\nout vec4 outFinal;\n";
        let sections = split_sections(src);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].stage, ShaderStage::Vertex);
        assert_eq!(sections[0].source, "void main() {}\n");
        assert_eq!(sections[0].first_line, 3);
        assert_eq!(sections[1].stage, ShaderStage::Fragment);
        assert_eq!(sections[1].source, "out vec4 outFinal;\n");
        assert_eq!(sections[1].first_line, 5);
    }

    #[test]
    fn test_marker_with_leading_whitespace() {
        let sections = split_sections("  #fragment\nA\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].source, "A\n");
    }

    #[test]
    fn test_marker_must_be_whole_token() {
        let sections = split_sections("#vertexish\nA\n#vertex\nB");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].source, "B");
    }

    #[test]
    fn test_no_markers() {
        assert!(split_sections("void main() {}\n").is_empty());
    }

    #[test]
    fn test_empty_section() {
        let sections = split_sections("#vertex\n#fragment\nX\n");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].source, "");
    }
}
