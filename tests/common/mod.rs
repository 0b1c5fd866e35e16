#![allow(dead_code)]

use anyhow::Result;
use claude_insights::{FrictionFacet, SessionRecord};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub fn session(id: &str, project: &str, start: &str) -> SessionRecord {
    SessionRecord {
        session_id: id.to_string(),
        project_path: project.to_string(),
        start_time: start.to_string(),
        ..Default::default()
    }
}

pub fn session_with_tools(id: &str, project: &str, start: &str, tools: &[(&str, u32)], commits: u32) -> SessionRecord {
    SessionRecord {
        tool_counts: tools.iter().map(|&(t, c)| (t.to_string(), c)).collect(),
        git_commits: commits,
        ..session(id, project, start)
    }
}

pub fn facet(id: &str, tags: &[(&str, u32)]) -> FrictionFacet {
    FrictionFacet {
        session_id: id.to_string(),
        friction_counts: tags.iter().map(|&(t, c)| (t.to_string(), c)).collect::<HashMap<_, _>>(),
        ..Default::default()
    }
}

pub fn write_jsonl<T: serde::Serialize>(dir: &Path, filename: &str, records: &[T]) -> Result<PathBuf> {
    let mut content = String::new();
    for record in records {
        content.push_str(&serde_json::to_string(record)?);
        content.push('\n');
    }
    let path = dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// One `<session_id>.json` file per facet, the layout the log scanner produces.
pub fn write_facet_dir(dir: &Path, facets: &[FrictionFacet]) -> Result<PathBuf> {
    let facet_dir = dir.join("facets");
    fs::create_dir_all(&facet_dir)?;
    for facet in facets {
        fs::write(
            facet_dir.join(format!("{}.json", facet.session_id)),
            serde_json::to_string_pretty(facet)?,
        )?;
    }
    Ok(facet_dir)
}
