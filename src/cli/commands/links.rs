//! `reqtrace links` command - Inspect typed edges

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::args::SourceArgs;
use crate::cli::commands::utils::load_workspace;
use crate::cli::helpers::truncate_str;
use crate::cli::report::edges_csv;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::graph::Graph;
use crate::core::links::{Edge, RelationType};

#[derive(clap::Args, Debug)]
pub struct LinksArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Show the links of one artifact (outgoing and incoming)
    pub id: Option<String>,

    /// Only show one relation (traces_to, depends_on, verified_by, ...)
    #[arg(long, short = 'r')]
    pub relation: Option<RelationType>,
}

/// An edge seen from one artifact
#[derive(Serialize)]
struct Neighbour<'g> {
    direction: &'static str,
    relation: &'static str,
    id: &'g str,
}

pub fn run(args: LinksArgs, global: &GlobalOpts) -> Result<()> {
    let ws = load_workspace(&args.sources, global)?;
    let keep = |e: &&Edge| args.relation.map_or(true, |r| e.relation == r);

    let Some(id) = args.id.as_deref() else {
        let edges: Vec<Edge> = ws.graph.edges().iter().filter(keep).cloned().collect();
        return print_edges(&ws.graph, &edges, global);
    };

    let id = ws
        .graph
        .aliases()
        .get(id)
        .map(String::as_str)
        .unwrap_or(id);
    if ws.graph.get(id).is_none() {
        return Err(miette::miette!(
            code = "reqtrace::links::unknown_id",
            help = "run `reqtrace build --format id` to list known identifiers",
            "no artifact '{}' in this project",
            id
        ));
    }

    let mut neighbours: Vec<Neighbour> = ws
        .graph
        .outgoing(id)
        .iter()
        .filter(keep)
        .map(|e| Neighbour {
            direction: "outgoing",
            relation: e.relation.as_str(),
            id: e.to.as_str(),
        })
        .collect();
    for from in ws.graph.incoming(id) {
        for edge in ws.graph.outgoing(from).iter().filter(keep).filter(|e| e.to == id) {
            neighbours.push(Neighbour {
                direction: "incoming",
                relation: edge.relation.reverse_label(),
                id: edge.from.as_str(),
            });
        }
    }

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&neighbours).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for n in &neighbours {
                println!("{}", n.id);
            }
        }
        OutputFormat::Csv => {
            println!("direction,relation,id");
            for n in &neighbours {
                println!("{},{},{}", n.direction, n.relation, n.id);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["Direction", "Relation", "ID", "Title"]);
            for n in &neighbours {
                builder.push_record([
                    n.direction.to_string(),
                    n.relation.to_string(),
                    n.id.to_string(),
                    title_of(&ws.graph, n.id),
                ]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto => {
            let title = ws.graph.get(id).map(|a| a.title.as_str()).unwrap_or_default();
            println!("{} - {}", style(id).cyan().bold(), title);
            println!("{}", style("─".repeat(60)).dim());

            if neighbours.is_empty() {
                println!("  {}", style("(no links)").dim());
            }
            for n in &neighbours {
                let arrow = if n.direction == "outgoing" { "→" } else { "←" };
                println!(
                    "  {} {:<14} {} {}",
                    arrow,
                    n.relation,
                    style(n.id).cyan(),
                    style(title_of(&ws.graph, n.id)).dim()
                );
            }
        }
    }

    Ok(())
}

fn print_edges(graph: &Graph, edges: &[Edge], global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(edges).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            print!("{}", edges_csv(edges).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for edge in edges {
                println!("{}", edge);
            }
        }
        OutputFormat::Md => {
            let mut builder = Builder::default();
            builder.push_record(["From", "Relation", "To"]);
            for edge in edges {
                builder.push_record([edge.from.as_str(), edge.relation.as_str(), edge.to.as_str()]);
            }
            println!("{}", builder.build().with(Style::markdown()));
        }
        OutputFormat::Auto => {
            for edge in edges {
                let target = if graph.is_defined(&edge.to) || graph.aliases().contains_key(&edge.to) {
                    style(edge.to.as_str()).cyan()
                } else {
                    style(edge.to.as_str()).yellow()
                };
                println!(
                    "{} {} {}",
                    style(&edge.from).cyan(),
                    style(format!("--{}-->", edge.relation)).dim(),
                    target
                );
            }
            println!();
            println!("{} link(s)", style(edges.len()).cyan());
        }
    }
    Ok(())
}

fn title_of(graph: &Graph, id: &str) -> String {
    graph
        .get(id)
        .map(|a| truncate_str(&a.title, 40))
        .unwrap_or_default()
}
