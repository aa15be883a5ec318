//! CSS text output.
//!
//! Statements (`@charset`, `@import`) come first. Consecutive blocks that
//! share a media query are grouped under one `@media` block.

use super::eval::Block;

const INDENT: &str = "  ";

pub fn render(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        if let Block::Statement(text) = block {
            out.push_str(text);
            out.push('\n');
        }
    }

    let rest: Vec<&Block> = blocks
        .iter()
        .filter(|b| !matches!(b, Block::Statement(_)))
        .collect();
    write_blocks(&mut out, &rest, 0);
    out
}

fn write_blocks(out: &mut String, blocks: &[&Block], indent: usize) {
    let mut i = 0;
    while i < blocks.len() {
        let media = blocks[i].media();
        let mut j = i + 1;
        while j < blocks.len() && blocks[j].media() == media {
            j += 1;
        }

        match media {
            None => blocks[i..j]
                .iter()
                .for_each(|block| write_block(out, block, indent)),
            Some(query) => {
                let pad = INDENT.repeat(indent);
                out.push_str(&format!("{pad}@media {query} {{\n"));
                blocks[i..j]
                    .iter()
                    .for_each(|block| write_block(out, block, indent + 1));
                out.push_str(&format!("{pad}}}\n"));
            }
        }
        i = j;
    }
}

fn write_block(out: &mut String, block: &Block, indent: usize) {
    let pad = INDENT.repeat(indent);
    match block {
        Block::Rule {
            selectors,
            declarations,
            ..
        } => {
            out.push_str(&pad);
            out.push_str(&selectors.join(&format!(",\n{pad}")));
            out.push_str(" {\n");
            write_declarations(out, declarations, indent + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        Block::AtRule {
            prelude,
            declarations,
            children,
            ..
        } => {
            out.push_str(&format!("{pad}{prelude} {{\n"));
            write_declarations(out, declarations, indent + 1);
            let children: Vec<&Block> = children.iter().collect();
            write_blocks(out, &children, indent + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        Block::Statement(text) => {
            out.push_str(&format!("{pad}{text}\n"));
        }
    }
}

fn write_declarations(out: &mut String, declarations: &[String], indent: usize) {
    let pad = INDENT.repeat(indent);
    for decl in declarations {
        out.push_str(&format!("{pad}{decl};\n"));
    }
}
