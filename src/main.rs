//! Small driver that loads `NAME=VALUE` pairs into a tree and reads every
//! name back, printing what the descent saw.

use bytes::Bytes;
use clap::Parser;

use nametree::{Key, NameTree, Path};

#[derive(Parser)]
#[command(name = "nametree", about = "Load domain names into an adaptive radix tree and look them up")]
struct Args {
    /// Domain names to store, optionally with a payload: `www.example.org=a`
    #[arg(required = true, value_name = "NAME[=VALUE]")]
    entries: Vec<String>,

    /// Print node-representation counts after loading
    #[arg(short, long)]
    stats: bool,
}

fn main() {
    let args = Args::parse();
    let mut tree: NameTree<Bytes> = NameTree::new();

    for entry in &args.entries {
        let (name, value) = entry
            .split_once('=')
            .unwrap_or((entry.as_str(), "foobar"));
        let key = match Key::from_text(name) {
            Ok(key) => key,
            Err(err) => {
                eprintln!("skipped {name}: {err}");
                continue;
            }
        };

        let mut path = Path::new();
        let leaf = tree.make_path(&mut path, &key);
        let status = if leaf.data.is_some() {
            "existed"
        } else {
            leaf.data = Some(Bytes::copy_from_slice(value.as_bytes()));
            "created"
        };
        let stored = leaf.data.as_ref().map(|data| String::from_utf8_lossy(data).into_owned());
        println!(
            "{name} {status} (height: {}, value: {})",
            path.height(),
            stored.as_deref().unwrap_or("-"),
        );
    }

    for entry in &args.entries {
        let name = entry.split_once('=').map_or(entry.as_str(), |(name, _)| name);
        let key = match Key::from_text(name) {
            Ok(key) => key,
            Err(_) => continue,
        };

        let mut path = Path::new();
        match tree.find_path(&mut path, &key) {
            Some(leaf) => {
                let value = leaf
                    .data
                    .as_ref()
                    .map(|data| String::from_utf8_lossy(data).into_owned());
                println!(
                    "{name} found (height: {}, value: {})",
                    path.height(),
                    value.as_deref().unwrap_or("-"),
                );
            }
            None => println!("{name} not found"),
        }
    }

    if args.stats {
        let stats = tree.stats();
        println!(
            "nodes: {} node4, {} node16, {} node32, {} node38, {} node48, {} node256; {} leaves",
            stats.node4, stats.node16, stats.node32, stats.node38, stats.node48, stats.node256, stats.leaves,
        );
    }
}
