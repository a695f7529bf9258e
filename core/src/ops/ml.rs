//! Traditional machine-learning operators (`ai.onnx.ml`).
use crate::model::AttributeKind;
use crate::ops::{ML_DOMAIN, OpSchema};

const FEATURES: &[&str] = &["tensor(float)", "tensor(double)", "tensor(int64)", "tensor(int32)"];

/// The schemas `register_builtin_ops` publishes.
pub(super) fn schemas() -> Vec<OpSchema> {
    vec![
        OpSchema::new("CastMap")
            .domain(ML_DOMAIN)
            .doc("Converts a map to a tensor, keys giving positions.")
            .input("X", "T1", "The input map.")
            .output("Y", "T2", "Dense or sparse tensor built from the map values.")
            .attr_with_default("cast_to", "TO_FLOAT, TO_STRING or TO_INT64.", "TO_FLOAT")
            .attr_with_default("map_form", "DENSE or SPARSE.", "DENSE")
            .attr_with_default("max_map", "Output length in SPARSE form.", 1i64)
            .type_constraint("T1", &["map(int64,string)", "map(int64,float)"], "Input maps.")
            .type_constraint(
                "T2",
                &["tensor(string)", "tensor(float)", "tensor(int64)"],
                "Output tensors.",
            ),

        OpSchema::new("FeatureVectorizer")
            .domain(ML_DOMAIN)
            .doc("Concatenates its inputs into one feature vector.")
            .variadic_input("X", "T1", "Feature tensors.")
            .output("Y", "tensor(float)", "The concatenated features.")
            .attr("inputdimensions", "Size of each input in the output.", AttributeKind::Ints)
            .type_constraint("T1", FEATURES, "Feature types."),

        OpSchema::new("LinearRegressor")
            .domain(ML_DOMAIN)
            .doc("Generalized linear regression.")
            .input("X", "T", "Features, one row per sample.")
            .output("Y", "tensor(float)", "Regression values, one row per sample.")
            .attr("coefficients", "Weights, targets times features.", AttributeKind::Floats)
            .attr("intercepts", "One bias per target.", AttributeKind::Floats)
            .attr_with_default("targets", "Number of regression targets.", 1i64)
            .attr_with_default("post_transform", "NONE, SOFTMAX, LOGISTIC, SOFTMAX_ZERO or PROBIT.", "NONE")
            .type_constraint("T", FEATURES, "Feature types."),

        OpSchema::new("SVMClassifier")
            .domain(ML_DOMAIN)
            .doc("Support vector machine classifier.")
            .input("X", "T1", "Features, one row per sample.")
            .output("Y", "T2", "Predicted class labels.")
            .output("Z", "tensor(float)", "Class scores, one row per sample.")
            .attr_with_default("kernel_type", "LINEAR, POLY, RBF or SIGMOID.", "LINEAR")
            .attr("kernel_params", "gamma, coef0 and degree.", AttributeKind::Floats)
            .attr("vectors_per_class", "Support vector count per class.", AttributeKind::Ints)
            .attr("support_vectors", "The support vectors.", AttributeKind::Floats)
            .attr("coefficients", "Dual coefficients.", AttributeKind::Floats)
            .attr("rho", "Per-pair intercepts.", AttributeKind::Floats)
            .attr("prob_a", "First Platt scaling coefficient.", AttributeKind::Floats)
            .attr("prob_b", "Second Platt scaling coefficient.", AttributeKind::Floats)
            .attr_with_default("post_transform", "NONE, SOFTMAX, LOGISTIC, SOFTMAX_ZERO or PROBIT.", "NONE")
            .attr("classlabels_ints", "Integer class labels.", AttributeKind::Ints)
            .attr("classlabels_strings", "String class labels.", AttributeKind::Strings)
            .type_constraint("T1", FEATURES, "Feature types.")
            .type_constraint("T2", &["tensor(string)", "tensor(int64)"], "Label types."),
    ]
}
