/// Calculate Relative Strength Index (RSI) over the last `period` price changes
///
/// This is a simple RSI: gains and losses are plain sums over the window,
/// without Wilder's exponential smoothing, so values react faster than the
/// canonical indicator.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// A window with no losses returns 100.0, including a flat window where
/// nothing moved at all.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - (period + 1)..];

    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    if losses == 0.0 {
        return Some(100.0);
    }

    let rs = gains / losses;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5,
            46.0, 46.5, 46.25, 46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14).unwrap();
        // gains 4.0, losses 1.5 over the 14 changes
        assert!((rsi - (100.0 - 100.0 / (1.0 + 4.0 / 1.5))).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        assert!(calculate_rsi(&prices, 14).is_none());
        // period + 1 samples is the minimum
        assert!(calculate_rsi(&prices, 2).is_some());
    }

    #[test]
    fn test_rsi_strictly_increasing_is_100() {
        for period in [1, 5, 14] {
            let prices: Vec<f64> = (0..period + 3).map(|i| 100.0 + i as f64).collect();
            assert_eq!(calculate_rsi(&prices, period), Some(100.0));
        }
    }

    #[test]
    fn test_rsi_flat_prices_is_100() {
        let prices = vec![250.0; 20];
        assert_eq!(calculate_rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_only_uses_last_window() {
        // An early crash falls outside the 3-change window
        let prices = vec![100.0, 10.0, 11.0, 12.0, 13.0];
        assert_eq!(calculate_rsi(&prices, 3), Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let prices = vec![105.0, 104.0, 103.0, 102.0];
        assert_eq!(calculate_rsi(&prices, 3), Some(0.0));
    }
}
