//! Output contracts of the coshell CLI

mod output_contracts;
