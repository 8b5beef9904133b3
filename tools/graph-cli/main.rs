use actiongraph::prelude::*;
use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Inspect, run and convert serialized action graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Generated define files (JSON) to register before loading the graph
    #[arg(short, long, global = true)]
    defines: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the nodes, ports and connections of a graph
    Inspect {
        /// Graph file (.json, or bincode otherwise)
        graph: String,
    },
    /// Run a graph from a node's control input and print the values it produced
    Run {
        graph: String,
        /// Node whose `enter` input starts the run
        #[arg(short, long)]
        node: u32,
        /// Id of the card the effect belongs to
        #[arg(long)]
        card: Option<u64>,
        /// Id of the buff the effect belongs to
        #[arg(long)]
        buff: Option<u64>,
        /// Path to a FlowOptions JSON file
        #[arg(long)]
        options: Option<String>,
    },
    /// Convert a JSON graph to bincode
    Encode { input: String, output: String },
    /// Convert a bincode graph to JSON
    Decode { input: String, output: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { graph } => {
            let catalog = load_catalog(&cli.defines);
            let graph = build_graph(&graph, &catalog);
            print_graph(&graph);
        }
        Command::Run {
            graph,
            node,
            card,
            buff,
            options,
        } => {
            let catalog = load_catalog(&cli.defines);
            let graph = Arc::new(build_graph(&graph, &catalog));
            let options = options.map(|path| {
                let json = read_file(&path);
                serde_json::from_str::<FlowOptions>(&json).unwrap_or_else(|e| {
                    exit_with_error(&format!("Failed to parse options '{}': {}", path, e))
                })
            });
            run_graph(graph, NodeId(node), card, buff, options.unwrap_or_default()).await;
        }
        Command::Encode { input, output } => {
            let snapshot = SerializableGraph::from_json(&read_file(&input))
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            snapshot
                .save(&output)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            println!("Wrote {} ({} nodes)", output, snapshot.nodes.len());
        }
        Command::Decode { input, output } => {
            let snapshot = SerializableGraph::from_file(&input)
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            let json = snapshot
                .to_json()
                .unwrap_or_else(|e| exit_with_error(&e.to_string()));
            fs::write(&output, json).unwrap_or_else(|e| {
                exit_with_error(&format!("Could not write to file '{}': {}", output, e))
            });
            println!("Wrote {} ({} nodes)", output, snapshot.nodes.len());
        }
    }
}

fn load_catalog(define_paths: &[String]) -> DefineCatalog {
    let mut catalog = DefineCatalog::with_builtins()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to register builtins: {}", e)));
    for path in define_paths {
        let define = SerializableDefine::from_json(&read_file(path))
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse '{}': {}", path, e)));
        catalog
            .load_generated(&define)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load '{}': {}", path, e)));
    }
    catalog
}

fn build_graph(path: &str, catalog: &DefineCatalog) -> ActionGraph {
    let snapshot = if path.ends_with(".json") {
        SerializableGraph::from_json(&read_file(path))
    } else {
        SerializableGraph::from_file(path)
    }
    .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph '{}': {}", path, e)));

    snapshot
        .build(catalog, None)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to rebuild graph '{}': {}", path, e)))
}

async fn run_graph(
    graph: Arc<ActionGraph>,
    node: NodeId,
    card: Option<u64>,
    buff: Option<u64>,
    options: FlowOptions,
) {
    let mut env = FlowEnv::new();
    if let Some(card) = card {
        env = env.with_card(Value::Card(card));
    }
    if let Some(buff) = buff {
        env = env.with_buff(Value::Buff(buff));
    }
    let mut flow = Flow::builder(Arc::clone(&graph))
        .with_env(env)
        .with_options(options)
        .build();

    let start = Instant::now();
    flow.run_node(node)
        .await
        .unwrap_or_else(|e| exit_with_error(&format!("Run failed: {}", e)));
    let duration = start.elapsed();

    println!("\nRun Finished in {:?}", duration);
    for node in graph.nodes() {
        for port in node.outputs() {
            let (Some(port), Some(value)) = (graph.port(*port), flow.cached_value(*port)) else {
                continue;
            };
            println!("  [{}] {}.{} = {}", node.id(), node.kind().name(), port.name(), value);
        }
    }
}

fn print_graph(graph: &ActionGraph) {
    println!("--- Nodes ({}) ---", graph.node_count());
    for node in graph.nodes() {
        let position = node.position();
        println!(
            "[{}] {} at ({}, {})",
            node.id(),
            node.kind().name(),
            position.x,
            position.y
        );
        for (name, value) in node.consts() {
            println!("    const {} = {}", name, value);
        }
        for port in node.ports().filter_map(|id| graph.port(id)) {
            println!("    {} : {}", port.describe(), port.value_type());
        }
    }

    println!("\n--- Connections ({}) ---", graph.connections().len());
    for connection in graph.connections() {
        let (Some(source), Some(destination)) = (
            graph.port(connection.source()),
            graph.port(connection.destination()),
        ) else {
            continue;
        };
        println!(
            "{} {}.{} -> {}.{}",
            connection.kind(),
            source.node(),
            source.slot(),
            destination.node(),
            destination.slot()
        );
    }
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read file '{}': {}", path, e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
