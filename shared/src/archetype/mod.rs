pub mod archetype_table;
