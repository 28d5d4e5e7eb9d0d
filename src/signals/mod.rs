pub mod trend_detector;
