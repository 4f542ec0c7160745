//! End-to-end coverage of schema loading feeding the mutation engine,
//! without requiring a real Verilator build or Spike binary on the test
//! machine — those are covered by the scripted-CPU paths inside
//! `src/harness`.

use std::fs;
use std::sync::Arc;

use rv32fuzz::isa::load_isa_config;
use rv32fuzz::mutate::{Mutator, MutatorConfig, Strategy};

const BASE_YAML: &str = r#"
base_width: 32
register_count: 32
fields:
  opcode:
    lsb: 0
    width: 7
  rd:
    lsb: 7
    width: 5
  funct3:
    lsb: 12
    width: 3
  rs1:
    lsb: 15
    width: 5
  rs2:
    lsb: 20
    width: 5
  funct7:
    lsb: 25
    width: 7
formats:
  r_type:
    word_width: 32
    fields: [opcode, rd, funct3, rs1, rs2, funct7]
instructions:
  - mnemonic: add
    format: r_type
    fixed_fields:
      opcode: 51
      funct3: 0
      funct7: 0
  - mnemonic: sub
    format: r_type
    fixed_fields:
      opcode: 51
      funct3: 0
      funct7: 32
"#;

fn write_schema_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("isa_map.yaml"), "rv32i: [rv32i.yaml]\n").unwrap();
    fs::write(dir.path().join("rv32i.yaml"), BASE_YAML).unwrap();
    dir
}

#[test]
fn loaded_schema_feeds_schema_guided_mutation() {
    let dir = write_schema_dir();
    let config = load_isa_config(dir.path(), "rv32i").unwrap();
    assert_eq!(config.instructions.len(), 2);

    let mutator_config = MutatorConfig { strategy: Strategy::Ir, ..Default::default() };
    let mut mutator = Mutator::new(Some(Arc::new(config)), mutator_config, 12345);

    let out = mutator.mutate(&[0u8; 4]);
    assert!(out.len() >= 4);

    let word = u32::from_le_bytes(out[out.len() - 8..out.len() - 4].try_into().unwrap());
    let opcode = word & 0x7F;
    assert_eq!(opcode, 0x33);
}

#[test]
fn mutation_is_deterministic_given_the_same_seed_and_schema() {
    let dir = write_schema_dir();
    let config_a = Arc::new(load_isa_config(dir.path(), "rv32i").unwrap());
    let config_b = Arc::new(load_isa_config(dir.path(), "rv32i").unwrap());

    let mutator_config = MutatorConfig { strategy: Strategy::Hybrid, ..Default::default() };
    let mut a = Mutator::new(Some(config_a), mutator_config.clone(), 777);
    let mut b = Mutator::new(Some(config_b), mutator_config, 777);

    for seed_bytes in [[1u8, 2, 3, 4], [5, 6, 7, 8], [0, 0, 0, 0]] {
        assert_eq!(a.mutate(&seed_bytes), b.mutate(&seed_bytes));
    }
}

#[test]
fn unknown_isa_name_surfaces_as_schema_error() {
    let dir = write_schema_dir();
    let err = load_isa_config(dir.path(), "rv64gc").unwrap_err();
    assert!(matches!(err, rv32fuzz::isa::SchemaError::UnknownIsa { .. }));
}

#[test]
fn every_mutated_output_ends_in_the_ecall_exit_envelope() {
    let dir = write_schema_dir();
    let config = Arc::new(load_isa_config(dir.path(), "rv32i").unwrap());
    let mut mutator = Mutator::new(Some(config), MutatorConfig::default(), 42);

    for _ in 0..10 {
        let out = mutator.mutate(&[0xAA; 16]);
        let trailer = u32::from_le_bytes(out[out.len() - 4..].try_into().unwrap());
        assert_eq!(trailer, 0x0000_0073);
    }
}
