// arbor-trees/tests/serde.rs
#![cfg(feature = "serde")]

use arbor::prelude::*;
use arbor_trees::{DecisionTree, RandomForestClassifier, TreeNode};

fn training_rows() -> Matrix<f64, String> {
    Matrix::from_rows((0..24).map(|i| {
        let x = i as f64;
        let label = if i < 12 { "DOWN" } else { "UP" };
        Row::new(vec![x, (x * 7.0) % 4.0], label.to_string())
    }))
    .unwrap()
}

#[test]
fn nodes_are_externally_tagged() {
    let node: TreeNode<f64, String> = TreeNode::Internal {
        feature_idx: 1,
        split_value: 2.5,
        impurity_decrease: 0.25,
        left: Box::new(TreeNode::leaf("A".to_string())),
        right: Box::new(TreeNode::leaf("B".to_string())),
    };

    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["Internal"]["feature_idx"], 1);
    assert_eq!(value["Internal"]["split_value"], 2.5);
    assert_eq!(value["Internal"]["left"]["Leaf"]["prediction"], "A");
    assert_eq!(value["Internal"]["right"]["Leaf"]["prediction"], "B");
}

#[test]
fn trained_tree_survives_json() {
    let matrix = training_rows();
    let tree = DecisionTree::params().fit(&matrix).unwrap();

    let json = serde_json::to_string(&tree).unwrap();
    let restored: DecisionTree<f64, String> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, tree);
    assert_eq!(restored.predict(&matrix), tree.predict(&matrix));
}

#[test]
fn forest_survives_json() {
    let matrix = training_rows();
    let forest = RandomForestClassifier::params()
        .n_trees(4)
        .fit(&matrix)
        .unwrap();

    let json = serde_json::to_string(&forest).unwrap();
    let restored: RandomForestClassifier<f64, String> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.ntrees(), 4);
    assert_eq!(restored.predict(&matrix), forest.predict(&matrix));
}

#[test]
fn empty_forest_is_rejected_on_decode() {
    let decoded = serde_json::from_str::<RandomForestClassifier<f64, String>>(r#"{"trees":[]}"#);

    assert!(decoded.is_err());
}

#[test]
fn split_beyond_feature_count_is_rejected_on_decode() {
    let json = r#"{
        "root_node": {"Internal": {
            "feature_idx": 3,
            "split_value": 1.0,
            "impurity_decrease": 0.5,
            "left": {"Leaf": {"prediction": "DOWN"}},
            "right": {"Leaf": {"prediction": "UP"}}
        }},
        "num_features": 2
    }"#;
    assert!(serde_json::from_str::<DecisionTree<f64, String>>(json).is_err());

    let json = json.replace("\"num_features\": 2", "\"num_features\": 4");
    let tree: DecisionTree<f64, String> = serde_json::from_str(&json).unwrap();
    assert_eq!(tree.mean_impurity_decrease(), vec![0.0, 0.0, 0.0, 0.5]);
}
