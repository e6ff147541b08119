use crate::error::MappingError;
use crate::mappings::Mappings;

/// Supported text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    /// `PK:`/`CL:`/`FD:`/`MD:` records.
    Srg,
    /// Compact SRG: one space-separated record per line, members keyed by owner.
    Csrg,
    /// Tab-indented members under their class line.
    Tsrg,
    /// TSRG with a `tsrg2 <from> <to> ...` namespace header.
    Tsrg2,
}

impl MappingFormat {
    /// Detects the format from the first meaningful line, falling back to TSRG when any member
    /// line is tab-indented.
    pub fn detect(text: &str) -> Option<Self> {
        let mut lines = meaningful_lines(text);
        let (_, first) = lines.next()?;
        if first.starts_with("tsrg2 ") {
            return Some(MappingFormat::Tsrg2);
        }
        if ["PK:", "CL:", "FD:", "MD:"].iter().any(|p| first.starts_with(p)) {
            return Some(MappingFormat::Srg);
        }
        if lines.any(|(_, line)| line.starts_with('\t')) {
            return Some(MappingFormat::Tsrg);
        }
        Some(MappingFormat::Csrg)
    }
}

/// Yields `(1-based line number, line)` with comments stripped and blank lines dropped.
fn meaningful_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(idx, line)| {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            None
        } else {
            Some((idx + 1, line))
        }
    })
}

pub(crate) fn parse(text: &str, format: MappingFormat) -> Result<Mappings, MappingError> {
    let mut out = Mappings::new();
    match format {
        MappingFormat::Srg => parse_srg(text, &mut out)?,
        MappingFormat::Csrg => parse_csrg(text, &mut out)?,
        MappingFormat::Tsrg => parse_tsrg(text, &mut out, None)?,
        MappingFormat::Tsrg2 => {
            let mut lines = meaningful_lines(text);
            let namespaces = match lines.next() {
                Some((line, header)) => {
                    let count = header.split_whitespace().count() - 1;
                    if count < 2 {
                        return Err(MappingError::parse(line, "tsrg2 header needs two namespaces"));
                    }
                    count
                }
                None => return Err(MappingError::UnknownFormat),
            };
            parse_tsrg(text, &mut out, Some(namespaces))?
        }
    }
    Ok(out)
}

fn split_member(line: usize, path: &str) -> Result<(&str, &str), MappingError> {
    path.rsplit_once('/')
        .ok_or_else(|| MappingError::parse(line, format!("expected owner/name, found `{path}`")))
}

fn parse_srg(text: &str, out: &mut Mappings) -> Result<(), MappingError> {
    for (line, content) in meaningful_lines(text) {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        match tokens.as_slice() {
            ["PK:", original, mapped] => out.add_package(original, mapped),
            ["CL:", original, mapped] => out.add_class(original, mapped),
            ["FD:", original, mapped] | ["FD:", original, _, mapped, _] => {
                let (owner, name) = split_member(line, original)?;
                let (_, mapped) = split_member(line, mapped)?;
                out.add_field(owner, name, mapped);
            }
            ["MD:", original, descriptor, mapped, _] => {
                let (owner, name) = split_member(line, original)?;
                let (_, mapped) = split_member(line, mapped)?;
                out.add_method(owner, name, descriptor, mapped);
            }
            _ => {
                return Err(MappingError::parse(
                    line,
                    format!("malformed SRG record `{content}`"),
                ))
            }
        }
    }
    Ok(())
}

fn parse_csrg(text: &str, out: &mut Mappings) -> Result<(), MappingError> {
    for (line, content) in meaningful_lines(text) {
        let tokens: Vec<&str> = content.split_whitespace().collect();
        match tokens.as_slice() {
            [original, mapped] if original.ends_with('/') => out.add_package(original, mapped),
            [original, mapped] => out.add_class(original, mapped),
            [owner, name, mapped] => out.add_field(owner, name, mapped),
            [owner, name, descriptor, mapped] => out.add_method(owner, name, descriptor, mapped),
            _ => {
                return Err(MappingError::parse(
                    line,
                    format!("malformed CSRG record `{content}`"),
                ))
            }
        }
    }
    Ok(())
}

/// Shared TSRG/TSRG2 reader. `namespaces` is set for TSRG2, whose header line is skipped and
/// whose extra namespace columns are ignored.
fn parse_tsrg(
    text: &str,
    out: &mut Mappings,
    namespaces: Option<usize>,
) -> Result<(), MappingError> {
    let mut lines = meaningful_lines(text);
    if namespaces.is_some() {
        lines.next();
    }
    let columns = namespaces.unwrap_or(2);

    let mut class: Option<String> = None;
    for (line, content) in lines {
        if content.starts_with("\t\t") {
            // Parameter and `static` markers.
            continue;
        }
        let tokens: Vec<&str> = content.split_whitespace().collect();

        if !content.starts_with('\t') {
            match tokens.as_slice() {
                [original, mapped, ..] if tokens.len() == columns => {
                    if original.ends_with('/') {
                        out.add_package(original, mapped);
                        class = None;
                    } else {
                        out.add_class(original, mapped);
                        class = Some(original.to_string());
                    }
                }
                _ => {
                    return Err(MappingError::parse(
                        line,
                        format!("malformed class record `{content}`"),
                    ))
                }
            }
            continue;
        }

        let Some(owner) = class.as_deref() else {
            return Err(MappingError::parse(line, "member record outside of a class"));
        };
        match tokens.as_slice() {
            [name, descriptor, mapped, ..]
                if descriptor.starts_with('(') && tokens.len() == columns + 1 =>
            {
                out.add_method(owner, name, descriptor, mapped)
            }
            [name, mapped, ..] if tokens.len() == columns => out.add_field(owner, name, mapped),
            // TSRG2 fields may carry their descriptor.
            [name, _, mapped, ..] if namespaces.is_some() && tokens.len() == columns + 1 => {
                out.add_field(owner, name, mapped)
            }
            _ => {
                return Err(MappingError::parse(
                    line,
                    format!("malformed member record `{content}`"),
                ))
            }
        }
    }
    Ok(())
}
