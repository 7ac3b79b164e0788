use avlbst::*;
use itertools::Itertools;
use rand::prelude::*;
use rand_pcg::Pcg64;

fn print_in_order<K: std::fmt::Display, V: std::fmt::Display, C: ConfigT>(tree: &AvlTree<K, V, C>) {
    tree.traverse(Order::InOrder, |node| println!("{}", node));
}

fn print_shape<K: std::fmt::Display, V, C: ConfigT>(tree: &AvlTree<K, V, C>) {
    fn walk<K: std::fmt::Display, V>(node: Option<NodeRef<'_, K, V>>, level: usize) {
        if let Some(node) = node {
            walk(node.right(), level + 1);
            println!("{}{} (h={})", "    ".repeat(level), node.key(), node.height());
            walk(node.left(), level + 1);
        }
    }
    walk(tree.root(), 0);
}

fn uids() {
    let uids = [1611, 1819, 1320, 4276, 1797, 1558, 1000];
    let unames = ["lisa", "andy", "rich", "douglas", "jeff", "cfk", "parrish"];
    let mut tree = AvlTree::new();
    for (uid, uname) in uids.into_iter().zip(unames) {
        if let Err(e) = tree.insert(uid, uname) {
            println!("{}: {}", uid, e);
        }
    }
    println!("{}", tree);
    print_in_order(&tree);
    print_shape(&tree);
}

fn alphabet(rng: &mut Pcg64) {
    let mut tree = AvlTree::<char, u32, DebugConfig>::with_config();
    let line = "-".repeat(40);
    for key in 'A'..='Z' {
        let value = rng.random_range(0..100);
        println!("{}\ninserting {}-{}", line, key, value);
        if let Err(e) = tree.insert(key, value) {
            println!("{}: {}", key, e);
        }
        println!("{}", tree);
        println!(
            "pre-order: {}",
            tree.traverse_iter(Order::PreOrder).map(|node| node.key()).join(",")
        );
    }
    print_shape(&tree);
}

fn rebalance(rng: &mut Pcg64) {
    let mut keys = ('A'..='O').collect::<Vec<_>>();
    keys.shuffle(rng);
    let mut tree = AvlTree::<char, u32, DebugConfig>::with_config();
    for &key in &keys {
        let value = rng.random_range(0..100);
        println!("inserting {}-{}", key, value);
        if let Err(e) = tree.insert(key, value) {
            println!("{}: {}", key, e);
        }
    }
    keys.shuffle(rng);
    for key in keys {
        match tree.remove(&key) {
            Ok(value) => println!("removed {}-{}, size now {}", key, value, tree.len()),
            Err(e) => println!("{}: {}", key, e),
        }
    }
    println!("{}", tree);
}

fn main() {
    pretty_env_logger::init();
    let mut rng = Pcg64::seed_from_u64(2018);
    uids();
    alphabet(&mut rng);
    rebalance(&mut rng);
}
