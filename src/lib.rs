/*!
# Shopping Mall Sales Dashboard

A single-page analytics dashboard over a static sales transaction file, built in Rust.

## Overview

The dataset is loaded once at startup into an immutable base table. Four charts are
derived from it and scoped by a shopping mall selector; the monthly sales chart is also
scoped by a date range, and the category chart can switch between bars and a pie.

## Architecture

### Data Layer
- **record**: Transaction rows, exact money amounts, calendar months, day-first dates
- **loader**: CSV loading into the read-only [`loader::Dataset`]
- **error**: Load, parse and configuration errors

### Query Layer
- **aggregate**: Monthly revenue, category quantities, mean spend by age and gender,
  payment method counts

### Presentation Layer
- **chart**: Plotly-compatible figure descriptions for each derived table
- **graph**: Server-side SVG snapshots of a figure (`web` feature)
- **reactive**: Filter state, chart subscriptions and the dispatcher that re-renders
  only the charts whose inputs changed
- **app**: HTTP routes and the shared application context (`web` feature)
- **config**: Host, port, debug and data path from the environment

## REST API Endpoints

- `/` - The dashboard page
- `/api/options` - Malls, date span, chart types, defaults and chart dependencies
- `/api/update` - Figures affected by a filter change
- `/api/charts/{chart}` - One figure for the given filters
- `/api/charts/{chart}/svg` - The same figure as an SVG image
*/

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod error;
pub mod loader;
pub mod reactive;
pub mod record;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use error::{ConfigError, LoadError, ParseError};
pub use loader::Dataset;
pub use reactive::{ChartId, Dispatcher, FilterField, FilterState};
