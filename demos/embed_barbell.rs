//! Embed two 6-cliques joined by a bridge and print each node's nearest neighbor.
//!
//! Run: `cargo run --example embed_barbell`

use walkembed::{AdjacencyRow, ExecutionContext, Node2Vec, Node2VecConfig};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

fn main() -> walkembed::Result<()> {
    let mut rows: Vec<AdjacencyRow<String>> = Vec::new();
    for block in [0u32, 6] {
        for i in block..block + 6 {
            let nbrs = (block..block + 6).filter(|&j| j != i).map(|j| format!("v{j}"));
            rows.push(AdjacencyRow::new(format!("v{i}"), nbrs));
        }
    }
    rows.push(AdjacencyRow::new("v5".to_string(), ["v6".to_string()]));

    let config = Node2VecConfig {
        walk_length: 30,
        num_of_walks: 20,
        p: 1.0,
        q: 0.5,
        embedding_size: 16,
        window_size: 4,
        epochs: 2,
        verbose: true,
        ..Default::default()
    };
    let fitted = Node2Vec::new(config)?.fit(&ExecutionContext::available_parallelism(), &rows)?;

    let matrix = fitted.matrix();
    for u in 0..fitted.graph.node_count() {
        let best = (0..fitted.graph.node_count())
            .filter(|&v| v != u)
            .map(|v| (v, cosine(matrix.row(u), matrix.row(v))))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let (Some(name), Some((v, sim))) = (fitted.graph.node_name(u), best) {
            let other = fitted.graph.node_name(v).map_or("?", String::as_str);
            println!("{name:>4} -> {other:<4} cos={sim:.3}");
        }
    }
    Ok(())
}
